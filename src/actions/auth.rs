use serde_json::json;
use tracing::info;

use crate::context::ExecutionContext;
use crate::error::Result;

/// Log in unconditionally and report who we are logged in as
pub async fn login(ctx: &ExecutionContext) -> Result<()> {
    ctx.session().login().await?;

    let credential = &ctx.settings.credential;
    ctx.print(&json!({
        "portal": ctx.settings.portal.to_string(),
        "username": credential.username,
        "domain": credential.domain,
        "project": credential.project,
    }))
}

/// Forget the cached session for the configured identity
pub fn logout(ctx: &ExecutionContext) -> Result<()> {
    let credential = &ctx.settings.credential;
    match &ctx.store {
        Some(store) => {
            if store.clear(credential)? {
                info!("Removed cached session for {}", credential.username);
            } else {
                info!("No cached session for {}", credential.username);
            }
        }
        None => info!("Session caching is disabled; nothing to remove"),
    }
    Ok(())
}
