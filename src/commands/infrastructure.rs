//! Commands for read-only infrastructure resources: domains, nodes,
//! clusters and storage policies.

use crate::commands::params::{
    reference_parameter, references_parameter, COMMAND_CLUSTER, COMMAND_DOMAIN, COMMAND_LIST,
    COMMAND_NODE, COMMAND_SHOW, COMMAND_STORAGE_POLICY,
};
use clap::Command;

pub fn domain_command() -> Command {
    Command::new(COMMAND_DOMAIN)
        .about("Inspect domains")
        .subcommand_required(true)
        .subcommand(
            Command::new(COMMAND_LIST)
                .about("List domains")
                .visible_alias("ls"),
        )
        .subcommand(
            Command::new(COMMAND_SHOW)
                .about("Show domain details")
                .arg(reference_parameter("DOMAIN", "Domain name or ID")),
        )
}

pub fn node_command() -> Command {
    Command::new(COMMAND_NODE)
        .about("Inspect storage nodes")
        .subcommand_required(true)
        .subcommand(
            Command::new(COMMAND_LIST)
                .about("List nodes")
                .visible_alias("ls"),
        )
        .subcommand(
            Command::new(COMMAND_SHOW)
                .about("Show details of one or more nodes")
                .arg(references_parameter(
                    "NODE",
                    "Node host name or ID; the .vstoragedomain suffix may be omitted",
                )),
        )
}

pub fn cluster_command() -> Command {
    Command::new(COMMAND_CLUSTER)
        .about("Inspect the storage cluster")
        .subcommand_required(true)
        .subcommand(
            Command::new(COMMAND_SHOW)
                .about("Show cluster details")
                .arg(reference_parameter("CLUSTER", "Cluster name or numeric ID")),
        )
}

pub fn storage_policy_command() -> Command {
    Command::new(COMMAND_STORAGE_POLICY)
        .about("Inspect compute storage policies")
        .subcommand_required(true)
        .subcommand(
            Command::new(COMMAND_LIST)
                .about("List storage policies")
                .visible_alias("ls"),
        )
        .subcommand(
            Command::new(COMMAND_SHOW)
                .about("Show storage policy details")
                .arg(reference_parameter("STORAGE_POLICY", "Storage policy name or ID")),
        )
}
