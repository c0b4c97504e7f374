//! Task command definitions.

use crate::commands::params::{
    timeout_parameter, COMMAND_SHOW, COMMAND_TASK, COMMAND_WAIT, PARAMETER_TASK_ID,
};
use clap::{Arg, Command};

fn task_id_parameter() -> Arg {
    Arg::new(PARAMETER_TASK_ID)
        .value_name("TASK_ID")
        .required(true)
        .help("Backend task ID")
}

/// Create the task command with all its subcommands.
pub fn task_command() -> Command {
    Command::new(COMMAND_TASK)
        .about("Inspect backend tasks")
        .subcommand_required(true)
        .subcommand(
            Command::new(COMMAND_SHOW)
                .about("Show the current state of a task")
                .arg(task_id_parameter()),
        )
        .subcommand(
            Command::new(COMMAND_WAIT)
                .about("Wait for a task to finish")
                .arg(task_id_parameter())
                .arg(timeout_parameter()),
        )
}
