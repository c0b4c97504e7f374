//! Resource managers.
//!
//! A [`Manager`] knows how to fetch one resource kind by identifier and how
//! to list it. The [`ResourceDescriptor`] it carries tells the resolver which
//! attributes hold the identifier and the name, how user input becomes an
//! identifier, and whether the backend can filter lists by name.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Result, VinfraError};
use crate::session::{AuthSession, RequestOptions};

/// Anything a manager returns. Attributes are looked up by name and compared
/// as strings.
pub trait Resource: Clone + Send + Sync {
    fn attribute(&self, name: &str) -> Option<String>;
}

impl Resource for Value {
    fn attribute(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }
}

/// Identifier passed to [`Manager::get`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceId {
    Uuid(Uuid),
    Integer(u64),
    Text(String),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Uuid(uuid) => write!(f, "{}", uuid),
            ResourceId::Integer(number) => write!(f, "{}", number),
            ResourceId::Text(text) => f.write_str(text),
        }
    }
}

/// How a user-supplied string may be turned into an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityRule {
    /// Only UUIDs identify the resource
    UuidOnly,
    /// Identifiers are non-negative integers
    Numeric,
    /// Any non-empty string may be an identifier
    PlainString,
    /// Exactly this literal is accepted as an identifier
    Literal(&'static str),
}

impl IdentityRule {
    pub fn coerce(&self, input: &str) -> Option<ResourceId> {
        match self {
            IdentityRule::UuidOnly => None,
            IdentityRule::Numeric => input.trim().parse().ok().map(ResourceId::Integer),
            IdentityRule::PlainString if !input.is_empty() => {
                Some(ResourceId::Text(input.to_string()))
            }
            IdentityRule::PlainString => None,
            IdentityRule::Literal(literal) => {
                (input == *literal).then(|| ResourceId::Text(literal.to_string()))
            }
        }
    }
}

/// How a user-supplied name maps to the name the backend stores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameRule {
    Verbatim,
    /// Names are stored with this suffix; users may omit it
    DomainSuffix(&'static str),
}

impl NameRule {
    pub fn normalize(&self, input: &str) -> String {
        match self {
            NameRule::Verbatim => input.to_string(),
            NameRule::DomainSuffix(suffix) if input.ends_with(suffix) => input.to_string(),
            NameRule::DomainSuffix(suffix) => format!("{}{}", input, suffix),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Human-readable kind used in messages, e.g. `volume`
    pub kind: &'static str,
    pub id_attr: &'static str,
    pub name_attr: &'static str,
    pub identity: IdentityRule,
    pub name_rule: NameRule,
    /// Whether `list` accepts a server-side name filter
    pub server_filter: bool,
}

/// Filters for [`Manager::list`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub filters: Vec<(String, String)>,
    /// Page size; `-1` asks for every match
    pub limit: Option<i64>,
}

impl ListQuery {
    pub fn by_attribute(name: &str, value: &str) -> Self {
        ListQuery {
            filters: vec![(name.to_string(), value.to_string())],
            limit: None,
        }
    }

    pub fn unlimited(mut self) -> Self {
        self.limit = Some(-1);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

#[async_trait]
pub trait Manager: Send + Sync {
    type Item: Resource;

    fn descriptor(&self) -> &ResourceDescriptor;

    async fn get(&self, id: &ResourceId) -> Result<Self::Item>;

    async fn list(&self, query: &ListQuery) -> Result<Vec<Self::Item>>;
}

/// A resource kind served under one REST collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceKind {
    pub descriptor: ResourceDescriptor,
    pub path: &'static str,
}

/// Accept both a bare array and the `{"items": [...]}` envelope
fn list_items(value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut object) => {
            for key in ["items", "data", "results"] {
                if let Some(Value::Array(items)) = object.remove(key) {
                    return Ok(items);
                }
            }
            Err(VinfraError::Client(
                "Unexpected list response: no item array found".to_string(),
            ))
        }
        Value::Null => Ok(Vec::new()),
        other => Err(VinfraError::Client(format!(
            "Unexpected list response: {}",
            other
        ))),
    }
}

/// [`Manager`] backed by a REST collection of JSON objects
#[derive(Clone)]
pub struct RestManager {
    session: Arc<AuthSession>,
    kind: &'static ResourceKind,
}

impl RestManager {
    pub fn new(session: Arc<AuthSession>, kind: &'static ResourceKind) -> Self {
        RestManager { session, kind }
    }

    pub fn item_path(&self, id: &ResourceId) -> String {
        format!("{}/{}", self.kind.path, id)
    }

    pub fn collection_path(&self) -> &'static str {
        self.kind.path
    }
}

#[async_trait]
impl Manager for RestManager {
    type Item = Value;

    fn descriptor(&self) -> &ResourceDescriptor {
        &self.kind.descriptor
    }

    async fn get(&self, id: &ResourceId) -> Result<Value> {
        self.session
            .get_json(&self.item_path(id), RequestOptions::default())
            .await
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<Value>> {
        let mut options = query
            .filters
            .iter()
            .fold(RequestOptions::default(), |options, (key, value)| {
                options.with_query(key.as_str(), value.as_str())
            });
        if let Some(limit) = query.limit {
            options = options.with_query("limit", limit.to_string());
        }
        let response = self.session.get_json(self.kind.path, options).await?;
        list_items(response)
    }
}
