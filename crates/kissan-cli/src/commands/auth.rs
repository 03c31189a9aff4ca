use clap::Subcommand;
use kissan_core::storage::credentials;
use kissan_core::AuthUser;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Store the access token issued by the OTP login
    Login {
        /// User ID on the Kissan Growth API
        #[arg(long)]
        user_id: String,
        /// Bearer access token
        #[arg(long)]
        token: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
    },
    /// Remove stored credentials
    Logout,
    /// Check authentication status
    Status,
}

pub fn run(action: AuthAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AuthAction::Login {
            user_id,
            token,
            name,
        } => {
            if token.trim().is_empty() {
                return Err("--token must not be empty".into());
            }
            credentials::save_user(&AuthUser {
                user_id: user_id.clone(),
                access_token: token,
                display_name: name,
            })?;
            println!("logged in as {user_id}");
        }
        AuthAction::Logout => {
            credentials::clear_user()?;
            println!("logged out");
        }
        AuthAction::Status => match credentials::load_user()? {
            Some(user) => println!(
                "authenticated as {}",
                user.display_name.as_deref().unwrap_or(&user.user_id)
            ),
            None => println!("not authenticated"),
        },
    }
    Ok(())
}
