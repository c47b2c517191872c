//! CLI command handlers.

use anyhow::anyhow;
use foodshare_core::api::ApiError;

pub mod auth;
pub mod config;
pub mod listings;

/// Maps an API failure to the message the user should see.
///
/// An auth-kind error means the session has already been cleared; the
/// notice tells the user how to get back in. Every other failure keeps
/// its own message.
pub(crate) fn describe(err: ApiError) -> anyhow::Error {
    if err.is_auth() {
        anyhow!("{err}\nYour session has ended. Sign in again with `foodshare login`.")
    } else {
        anyhow!(err)
    }
}
