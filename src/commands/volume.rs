//! Volume command definitions.

use crate::commands::params::{
    reference_parameter, references_parameter, size_parameter, timeout_parameter, COMMAND_CREATE,
    COMMAND_DELETE, COMMAND_LIST, COMMAND_SHOW, COMMAND_VOLUME, PARAMETER_NAME,
    PARAMETER_STORAGE_POLICY,
};
use crate::kinds::DEFAULT_STORAGE_POLICY;
use clap::{Arg, Command};

/// Create the volume command with all its subcommands.
pub fn volume_command() -> Command {
    Command::new(COMMAND_VOLUME)
        .about("Manage compute volumes")
        .subcommand_required(true)
        .subcommand(
            Command::new(COMMAND_LIST)
                .about("List volumes")
                .visible_alias("ls"),
        )
        .subcommand(
            Command::new(COMMAND_SHOW)
                .about("Show volume details")
                .arg(reference_parameter("VOLUME", "Volume name or ID")),
        )
        .subcommand(
            Command::new(COMMAND_CREATE)
                .about("Create a volume and wait until it is ready")
                .arg(
                    Arg::new(PARAMETER_NAME)
                        .value_name("NAME")
                        .required(true)
                        .help("Name of the new volume"),
                )
                .arg(size_parameter())
                .arg(
                    Arg::new(PARAMETER_STORAGE_POLICY)
                        .long(PARAMETER_STORAGE_POLICY)
                        .num_args(1)
                        .value_name("STORAGE_POLICY")
                        .default_value(DEFAULT_STORAGE_POLICY)
                        .help("Storage policy name or ID"),
                )
                .arg(timeout_parameter()),
        )
        .subcommand(
            Command::new(COMMAND_DELETE)
                .about("Delete one or more volumes")
                .visible_alias("rm")
                .arg(references_parameter("VOLUME", "Volume name or ID"))
                .arg(timeout_parameter()),
        )
}
