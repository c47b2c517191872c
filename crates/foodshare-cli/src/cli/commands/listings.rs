//! Listing commands: browse, publish, claim.

use anyhow::{Context, Result};
use foodshare_core::api::ApiClient;
use serde_json::{Map, Value, json};

/// Listing inputs collected from the command line.
pub struct CreateArgs {
    pub title: String,
    pub category: String,
    pub quantity: String,
    pub description: Option<String>,
    pub address: Option<String>,
}

pub async fn nearby(api: &ApiClient) -> Result<()> {
    let listings = api.nearby_listings().await.map_err(super::describe)?;
    print_json(&listings)
}

pub async fn create(api: &ApiClient, args: CreateArgs) -> Result<()> {
    let mut listing = Map::new();
    listing.insert("title".to_string(), json!(args.title));
    listing.insert("category".to_string(), json!(args.category));
    listing.insert("quantity".to_string(), json!(args.quantity));
    if let Some(description) = args.description {
        listing.insert("description".to_string(), json!(description));
    }
    if let Some(address) = args.address {
        listing.insert("location".to_string(), json!({ "address": address }));
    }

    let created = api
        .create_listing(&Value::Object(listing))
        .await
        .map_err(super::describe)?;
    println!("Listing published.");
    print_json(&created)
}

pub async fn claim(api: &ApiClient, id: &str) -> Result<()> {
    let outcome = api.claim_listing(id).await.map_err(super::describe)?;
    println!("Listing {id} claimed.");
    print_json(&outcome)
}

fn print_json(value: &Value) -> Result<()> {
    if value.is_null() {
        return Ok(());
    }
    let pretty = serde_json::to_string_pretty(value).context("render response")?;
    println!("{pretty}");
    Ok(())
}
