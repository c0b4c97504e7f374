use clap::ArgMatches;

use crate::actions::references;
use crate::context::ExecutionContext;
use crate::error::Result;
use crate::manager::{ListQuery, Manager, ResourceKind};
use crate::resolver::{find_resource, find_resources};

pub async fn list(ctx: &ExecutionContext, kind: &'static ResourceKind) -> Result<()> {
    let items = ctx.manager(kind).list(&ListQuery::default()).await?;
    ctx.print(&items)
}

/// Show one resource as an object, several as an array
pub async fn show(
    ctx: &ExecutionContext,
    kind: &'static ResourceKind,
    sub_matches: &ArgMatches,
) -> Result<()> {
    let references = references(sub_matches)?;
    let manager = ctx.manager(kind);

    match references.as_slice() {
        [single] => {
            let item = find_resource(&manager, single).await?;
            ctx.print(&item)
        }
        many => {
            let items = find_resources(&manager, many).await?;
            ctx.print(&items)
        }
    }
}
