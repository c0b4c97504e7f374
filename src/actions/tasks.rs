use clap::ArgMatches;

use crate::commands::params::PARAMETER_TASK_ID;
use crate::context::ExecutionContext;
use crate::error::{Result, VinfraError};
use crate::task::{RestTask, Task};

fn task_from_args(ctx: &ExecutionContext, sub_matches: &ArgMatches) -> Result<RestTask> {
    let id = sub_matches
        .get_one::<String>(PARAMETER_TASK_ID)
        .ok_or_else(|| VinfraError::Validation("A task ID is required".to_string()))?;
    Ok(RestTask::new(ctx.session(), id.clone()))
}

pub async fn show(ctx: &ExecutionContext, sub_matches: &ArgMatches) -> Result<()> {
    let task = task_from_args(ctx, sub_matches)?;
    let status = task.status().await?;
    ctx.print(&status)
}

pub async fn wait(ctx: &ExecutionContext, sub_matches: &ArgMatches) -> Result<()> {
    let task = task_from_args(ctx, sub_matches)?;
    let status = ctx.waiter().wait(&task, ctx.timeout(sub_matches)).await?;
    ctx.print(&status)
}
