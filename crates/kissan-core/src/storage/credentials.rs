//! Signed-in user persisted in the OS keyring.

use crate::auth::AuthUser;
use crate::error::Result;

const SERVICE: &str = "kissan-growth";
const SESSION_KEY: &str = "session";

fn entry() -> Result<keyring::Entry> {
    Ok(keyring::Entry::new(SERVICE, SESSION_KEY)?)
}

/// Load the stored user, if any.
pub fn load_user() -> Result<Option<AuthUser>> {
    match entry()?.get_password() {
        Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn save_user(user: &AuthUser) -> Result<()> {
    let json = serde_json::to_string(user)?;
    entry()?.set_password(&json)?;
    Ok(())
}

/// Remove the stored user. Missing entries are not an error.
pub fn clear_user() -> Result<()> {
    match entry()?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
