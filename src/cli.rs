use clap::ArgMatches;

use vinfra::actions;
use vinfra::commands::{
    COMMAND_CLUSTER, COMMAND_CREATE, COMMAND_DELETE, COMMAND_DOMAIN, COMMAND_LIST, COMMAND_LOGIN,
    COMMAND_LOGOUT, COMMAND_NODE, COMMAND_SHOW, COMMAND_STORAGE_POLICY, COMMAND_TASK,
    COMMAND_VOLUME, COMMAND_WAIT,
};
use vinfra::context::ExecutionContext;
use vinfra::error::{Result, VinfraError};
use vinfra::kinds::{CLUSTER, DOMAIN, NODE, STORAGE_POLICY, VOLUME};

fn unsupported(sub_matches: &ArgMatches) -> VinfraError {
    let name = sub_matches
        .subcommand_name()
        .unwrap_or("unknown")
        .to_string();
    VinfraError::Validation(format!("Undefined or unsupported subcommand '{}'", name))
}

pub async fn execute_command(matches: &ArgMatches) -> Result<()> {
    let ctx = ExecutionContext::from_args(matches)?;

    match matches.subcommand() {
        Some((COMMAND_LOGIN, _)) => actions::auth::login(&ctx).await,
        Some((COMMAND_LOGOUT, _)) => actions::auth::logout(&ctx),
        Some((COMMAND_DOMAIN, sub_matches)) => match sub_matches.subcommand() {
            Some((COMMAND_LIST, _)) => actions::infrastructure::list(&ctx, &DOMAIN).await,
            Some((COMMAND_SHOW, m)) => actions::infrastructure::show(&ctx, &DOMAIN, m).await,
            _ => Err(unsupported(sub_matches)),
        },
        Some((COMMAND_NODE, sub_matches)) => match sub_matches.subcommand() {
            Some((COMMAND_LIST, _)) => actions::infrastructure::list(&ctx, &NODE).await,
            Some((COMMAND_SHOW, m)) => actions::infrastructure::show(&ctx, &NODE, m).await,
            _ => Err(unsupported(sub_matches)),
        },
        Some((COMMAND_CLUSTER, sub_matches)) => match sub_matches.subcommand() {
            Some((COMMAND_SHOW, m)) => actions::infrastructure::show(&ctx, &CLUSTER, m).await,
            _ => Err(unsupported(sub_matches)),
        },
        Some((COMMAND_STORAGE_POLICY, sub_matches)) => match sub_matches.subcommand() {
            Some((COMMAND_LIST, _)) => actions::infrastructure::list(&ctx, &STORAGE_POLICY).await,
            Some((COMMAND_SHOW, m)) => {
                actions::infrastructure::show(&ctx, &STORAGE_POLICY, m).await
            }
            _ => Err(unsupported(sub_matches)),
        },
        Some((COMMAND_VOLUME, sub_matches)) => match sub_matches.subcommand() {
            Some((COMMAND_LIST, _)) => actions::infrastructure::list(&ctx, &VOLUME).await,
            Some((COMMAND_SHOW, m)) => actions::infrastructure::show(&ctx, &VOLUME, m).await,
            Some((COMMAND_CREATE, m)) => actions::volumes::create(&ctx, m).await,
            Some((COMMAND_DELETE, m)) => actions::volumes::delete(&ctx, m).await,
            _ => Err(unsupported(sub_matches)),
        },
        Some((COMMAND_TASK, sub_matches)) => match sub_matches.subcommand() {
            Some((COMMAND_SHOW, m)) => actions::tasks::show(&ctx, m).await,
            Some((COMMAND_WAIT, m)) => actions::tasks::wait(&ctx, m).await,
            _ => Err(unsupported(sub_matches)),
        },
        _ => Err(unsupported(matches)),
    }
}
