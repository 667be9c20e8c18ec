//! Session commands.

use mercato_client::guard::landing_path;
use mercato_client::state::AppContext;
use secrecy::SecretString;

use super::CliError;

pub async fn login(
    ctx: &AppContext,
    identifier: &str,
    password: &SecretString,
) -> Result<(), CliError> {
    let identity = ctx.session().login(identifier, password).await?;
    tracing::info!(
        "Signed in as {} ({}), landing on {}",
        identity.username,
        identity.role,
        landing_path(&identity)
    );
    Ok(())
}

pub async fn register(
    ctx: &AppContext,
    username: &str,
    email: &str,
    password: &SecretString,
) -> Result<(), CliError> {
    let identity = ctx.session().register(username, email, password).await?;
    tracing::info!("Account created; signed in as {} <{}>", identity.username, identity.email);
    Ok(())
}

/// Sign out. Local state is gone even when the backend could not be told.
pub async fn logout(ctx: &AppContext) -> Result<(), CliError> {
    if ctx.session().identity().is_none() {
        tracing::info!("Not signed in");
        return Ok(());
    }
    ctx.session().logout_current().await?;
    tracing::info!("Signed out");
    Ok(())
}

pub fn whoami(ctx: &AppContext) {
    match ctx.session().identity() {
        Some(identity) => tracing::info!(
            "{} <{}> id={} role={}",
            identity.username,
            identity.email,
            identity.id,
            identity.role
        ),
        None => tracing::info!("Not signed in"),
    }
}
