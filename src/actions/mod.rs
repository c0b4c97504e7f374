//! Command handlers. Each function runs one leaf command against an
//! [`ExecutionContext`](crate::context::ExecutionContext).

use std::time::Duration;

use clap::ArgMatches;
use serde_json::Value;
use tracing::debug;

use crate::commands::params::PARAMETER_REFERENCE;
use crate::context::ExecutionContext;
use crate::error::{Result, VinfraError};
use crate::task::{RestTask, Task};

pub mod auth;
pub mod infrastructure;
pub mod tasks;
pub mod volumes;

/// Resource references given on the command line, in order
pub(crate) fn references(sub_matches: &ArgMatches) -> Result<Vec<String>> {
    let references: Vec<String> = sub_matches
        .get_many::<String>(PARAMETER_REFERENCE)
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    if references.is_empty() {
        return Err(VinfraError::Validation(
            "At least one resource name or ID is required".to_string(),
        ));
    }
    Ok(references)
}

/// Follow the task a mutating request started, if any, and return what the
/// caller should print
pub(crate) async fn complete_mutation(
    ctx: &ExecutionContext,
    response: Value,
    timeout: Duration,
) -> Result<Value> {
    let task = match RestTask::from_response(ctx.session(), &response) {
        Some(task) => task,
        None => return Ok(response),
    };

    debug!("Waiting up to {}s for task {}...", timeout.as_secs(), task.id());
    let status = ctx.waiter().wait(&task, timeout).await?;
    Ok(status.result.unwrap_or(response))
}
