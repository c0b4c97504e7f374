use clap::ArgMatches;
use serde_json::{json, Value};
use tracing::debug;

use crate::actions::{complete_mutation, references};
use crate::commands::params::{PARAMETER_NAME, PARAMETER_SIZE, PARAMETER_STORAGE_POLICY};
use crate::context::ExecutionContext;
use crate::error::{Result, VinfraError};
use crate::kinds::{DEFAULT_STORAGE_POLICY, STORAGE_POLICY, VOLUME};
use crate::manager::{Resource, ResourceId};
use crate::resolver::{find_resource, find_resources};

fn required_id(item: &Value, kind: &str) -> Result<String> {
    item.attribute("id")
        .ok_or_else(|| VinfraError::Client(format!("The {} returned by the portal has no id", kind)))
}

pub async fn create(ctx: &ExecutionContext, sub_matches: &ArgMatches) -> Result<()> {
    let name = sub_matches
        .get_one::<String>(PARAMETER_NAME)
        .ok_or_else(|| VinfraError::Validation("A volume name is required".to_string()))?;
    let size = *sub_matches
        .get_one::<u64>(PARAMETER_SIZE)
        .ok_or_else(|| VinfraError::Validation("A volume size is required".to_string()))?;
    let policy = sub_matches
        .get_one::<String>(PARAMETER_STORAGE_POLICY)
        .map(String::as_str)
        .unwrap_or(DEFAULT_STORAGE_POLICY);

    let policy = find_resource(&ctx.manager(&STORAGE_POLICY), policy).await?;
    let policy_id = required_id(&policy, "storage policy")?;

    let volumes = ctx.manager(&VOLUME);
    debug!("Creating volume {} of {} bytes...", name, size);
    let response = ctx
        .session()
        .post_json(
            volumes.collection_path(),
            json!({
                "name": name,
                "size": size,
                "storage_policy_id": policy_id,
            }),
        )
        .await?;

    let created = complete_mutation(ctx, response, ctx.timeout(sub_matches)).await?;
    ctx.print(&created)
}

pub async fn delete(ctx: &ExecutionContext, sub_matches: &ArgMatches) -> Result<()> {
    let references = references(sub_matches)?;
    let volumes = ctx.manager(&VOLUME);
    let timeout = ctx.timeout(sub_matches);

    for volume in find_resources(&volumes, &references).await? {
        let id = ResourceId::Text(required_id(&volume, "volume")?);
        debug!("Deleting volume {}...", id);
        let response = ctx.session().delete_json(&volumes.item_path(&id)).await?;
        complete_mutation(ctx, response, timeout).await?;
    }
    Ok(())
}
