//! Admin user directory commands.

use mercato_client::state::AppContext;

use super::CliError;

pub async fn list(ctx: &AppContext, search: &str) -> Result<(), CliError> {
    ctx.users().fetch_users().await?;
    let users = ctx.users().filtered(search);

    tracing::info!("{} account(s)", users.len());
    for user in users {
        let joined = user
            .created_at
            .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d").to_string());
        tracing::info!(
            "  {:<26} {:<20} {:<32} {:<8} {}",
            user.id.as_str(),
            user.username,
            user.email,
            user.role.as_str(),
            joined
        );
    }
    Ok(())
}
