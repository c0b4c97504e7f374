//! Resource kinds known to the CLI and where the portal serves them.

use crate::manager::{IdentityRule, NameRule, ResourceDescriptor, ResourceKind};

/// Node names are stored with this suffix appended
pub const NODE_NAME_SUFFIX: &str = ".vstoragedomain";

/// The one storage policy addressable by a literal identifier
pub const DEFAULT_STORAGE_POLICY: &str = "default";

pub static DOMAIN: ResourceKind = ResourceKind {
    descriptor: ResourceDescriptor {
        kind: "domain",
        id_attr: "id",
        name_attr: "name",
        identity: IdentityRule::UuidOnly,
        name_rule: NameRule::Verbatim,
        server_filter: true,
    },
    path: "api/v2/domains",
};

pub static NODE: ResourceKind = ResourceKind {
    descriptor: ResourceDescriptor {
        kind: "node",
        id_attr: "id",
        name_attr: "host",
        identity: IdentityRule::UuidOnly,
        name_rule: NameRule::DomainSuffix(NODE_NAME_SUFFIX),
        server_filter: false,
    },
    path: "api/v2/nodes",
};

pub static CLUSTER: ResourceKind = ResourceKind {
    descriptor: ResourceDescriptor {
        kind: "cluster",
        id_attr: "id",
        name_attr: "name",
        identity: IdentityRule::Numeric,
        name_rule: NameRule::Verbatim,
        server_filter: false,
    },
    path: "api/v2/clusters",
};

pub static STORAGE_POLICY: ResourceKind = ResourceKind {
    descriptor: ResourceDescriptor {
        kind: "storage policy",
        id_attr: "id",
        name_attr: "name",
        identity: IdentityRule::Literal(DEFAULT_STORAGE_POLICY),
        name_rule: NameRule::Verbatim,
        server_filter: true,
    },
    path: "api/v2/compute/storage-policies",
};

pub static VOLUME: ResourceKind = ResourceKind {
    descriptor: ResourceDescriptor {
        kind: "volume",
        id_attr: "id",
        name_attr: "name",
        identity: IdentityRule::UuidOnly,
        name_rule: NameRule::Verbatim,
        server_filter: true,
    },
    path: "api/v2/compute/volumes",
};
