//! Sign-in, sign-out and account commands.

use anyhow::Result;
use foodshare_core::api::ApiClient;
use foodshare_core::identity::{Location, LoginCredentials, RegisterProfile};
use foodshare_core::session::{Session, SessionStore};

/// Registration inputs collected from the command line.
pub struct RegisterArgs {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub role: String,
    pub address: Option<String>,
    pub pincode: Option<String>,
}

pub async fn login(
    store: &SessionStore,
    api: &ApiClient,
    email: String,
    password: String,
) -> Result<()> {
    let credentials = LoginCredentials::new(email, password);
    store.login(api, &credentials).await?;

    print_signed_in(store);
    Ok(())
}

pub async fn register(store: &SessionStore, api: &ApiClient, args: RegisterArgs) -> Result<()> {
    let location = args.address.map(|address| Location {
        address,
        pincode: args.pincode,
    });
    let profile = RegisterProfile {
        name: args.name,
        email: args.email,
        phone: args.phone,
        password: args.password,
        role: args.role,
        location,
    };
    store.register(api, &profile).await?;

    println!("Account created.");
    print_signed_in(store);
    Ok(())
}

pub fn logout(store: &SessionStore) -> Result<()> {
    store.logout();
    println!("Signed out.");
    Ok(())
}

pub fn whoami(store: &SessionStore) -> Result<()> {
    match store.current() {
        Some(session) => print_session(&session),
        None => println!("Not signed in. Use `foodshare login` or `foodshare register`."),
    }
    Ok(())
}

fn print_signed_in(store: &SessionStore) {
    if let Some(session) = store.current() {
        print_session(&session);
    }
}

fn print_session(session: &Session) {
    let name = session.user.name().unwrap_or("(unnamed)");
    println!("Signed in as {name}");
    if let Some(email) = session.user.email() {
        println!("  email: {email}");
    }
    if let Some(role) = session.user.role() {
        println!("  role:  {role}");
    }
}
