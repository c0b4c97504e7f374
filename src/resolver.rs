//! Turning what a user typed into concrete resources.
//!
//! A reference may be an identifier or a name. Resolution tries the cheap
//! direct lookups first and only then falls back to listing and matching.

use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, VinfraError};
use crate::manager::{ListQuery, Manager, Resource, ResourceDescriptor, ResourceId};

fn not_found(descriptor: &ResourceDescriptor, input: &str) -> VinfraError {
    VinfraError::Command(format!(
        "No {} with a {} or {} of '{}' exists.",
        descriptor.kind, descriptor.name_attr, descriptor.id_attr, input
    ))
}

fn ambiguous(descriptor: &ResourceDescriptor, input: &str) -> VinfraError {
    VinfraError::Command(format!(
        "More than one {} exists with the {} '{}'. Use the {} instead.",
        descriptor.kind, descriptor.name_attr, input, descriptor.id_attr
    ))
}

/// Exactly one match wins; none or several are errors naming the input
fn single_match<T>(descriptor: &ResourceDescriptor, input: &str, mut hits: Vec<T>) -> Result<T> {
    match hits.len() {
        0 => Err(not_found(descriptor, input)),
        1 => Ok(hits.remove(0)),
        _ => Err(ambiguous(descriptor, input)),
    }
}

fn matches_reference<R: Resource>(item: &R, descriptor: &ResourceDescriptor, key: &str) -> bool {
    item.attribute(descriptor.id_attr).as_deref() == Some(key)
        || item.attribute(descriptor.name_attr).as_deref() == Some(key)
}

/// Try a direct `get`. A portal or command error means "not this way";
/// login, connection and timeout failures end the resolution.
async fn lookup<M: Manager + ?Sized>(manager: &M, id: ResourceId) -> Result<Option<M::Item>> {
    match manager.get(&id).await {
        Ok(item) => Ok(Some(item)),
        Err(e @ (VinfraError::Http { .. } | VinfraError::Command(_))) => {
            debug!("Lookup of {} {} failed: {}", manager.descriptor().kind, id, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Resolve one name or identifier to exactly one resource.
///
/// Order of attempts: the input parsed as a UUID, the input coerced by the
/// kind's identity rule, then a (possibly server-filtered) listing matched on
/// both the identifier and the normalized name.
pub async fn find_resource<M: Manager + ?Sized>(manager: &M, name_or_id: &str) -> Result<M::Item> {
    let descriptor = *manager.descriptor();

    if let Ok(uuid) = Uuid::parse_str(name_or_id) {
        if let Some(item) = lookup(manager, ResourceId::Uuid(uuid)).await? {
            return Ok(item);
        }
    }

    if let Some(id) = descriptor.identity.coerce(name_or_id) {
        if let Some(item) = lookup(manager, id).await? {
            return Ok(item);
        }
    }

    let name = descriptor.name_rule.normalize(name_or_id);
    let query = if descriptor.server_filter {
        ListQuery::by_attribute(descriptor.name_attr, &name).unlimited()
    } else {
        ListQuery::default()
    };

    let hits: Vec<M::Item> = manager
        .list(&query)
        .await?
        .into_iter()
        .filter(|item| matches_reference(item, &descriptor, &name))
        .collect();

    single_match(&descriptor, name_or_id, hits)
}

/// Resolve several references, preserving their order.
///
/// Kinds without a server-side filter are listed once and matched locally;
/// the others resolve each reference on its own.
pub async fn find_resources<M, S>(manager: &M, references: &[S]) -> Result<Vec<M::Item>>
where
    M: Manager + ?Sized,
    S: AsRef<str>,
{
    let descriptor = *manager.descriptor();

    if descriptor.server_filter {
        let mut resolved = Vec::with_capacity(references.len());
        for reference in references {
            resolved.push(find_resource(manager, reference.as_ref()).await?);
        }
        return Ok(resolved);
    }

    let items = manager.list(&ListQuery::default()).await?;

    let mut by_id: HashMap<String, Vec<usize>> = HashMap::new();
    let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, item) in items.iter().enumerate() {
        if let Some(id) = item.attribute(descriptor.id_attr) {
            by_id.entry(id).or_default().push(index);
        }
        if let Some(name) = item.attribute(descriptor.name_attr) {
            by_name.entry(name).or_default().push(index);
        }
    }

    let mut resolved = Vec::with_capacity(references.len());
    for reference in references {
        let reference = reference.as_ref();
        let name = descriptor.name_rule.normalize(reference);
        let candidates = by_id
            .get(reference)
            .into_iter()
            .chain(by_id.get(&name))
            .chain(by_name.get(&name))
            .flatten();

        let mut hits: Vec<usize> = Vec::new();
        for index in candidates {
            if !hits.contains(index) {
                hits.push(*index);
            }
        }

        let index = single_match(&descriptor, reference, hits)?;
        resolved.push(items[index].clone());
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::{IdentityRule, NameRule};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeManager {
        descriptor: ResourceDescriptor,
        items: Vec<Value>,
        get_failure: Option<fn() -> VinfraError>,
        gets: AtomicUsize,
        lists: AtomicUsize,
        queries: Mutex<Vec<ListQuery>>,
    }

    impl FakeManager {
        fn new(descriptor: ResourceDescriptor, items: Vec<Value>) -> Self {
            FakeManager {
                descriptor,
                items,
                get_failure: None,
                gets: AtomicUsize::new(0),
                lists: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
            }
        }

        fn failing_gets(mut self, failure: fn() -> VinfraError) -> Self {
            self.get_failure = Some(failure);
            self
        }
    }

    #[async_trait]
    impl Manager for FakeManager {
        type Item = Value;

        fn descriptor(&self) -> &ResourceDescriptor {
            &self.descriptor
        }

        async fn get(&self, id: &ResourceId) -> Result<Value> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if let Some(failure) = self.get_failure {
                return Err(failure());
            }
            let id = id.to_string();
            self.items
                .iter()
                .find(|item| item.attribute(self.descriptor.id_attr).as_deref() == Some(id.as_str()))
                .cloned()
                .ok_or_else(|| VinfraError::http(StatusCode::NOT_FOUND, ""))
        }

        async fn list(&self, query: &ListQuery) -> Result<Vec<Value>> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.clone());
            Ok(self
                .items
                .iter()
                .filter(|item| {
                    query
                        .filters
                        .iter()
                        .all(|(key, value)| item.attribute(key).as_deref() == Some(value.as_str()))
                })
                .cloned()
                .collect())
        }
    }

    const VOLUMES: ResourceDescriptor = ResourceDescriptor {
        kind: "volume",
        id_attr: "id",
        name_attr: "name",
        identity: IdentityRule::UuidOnly,
        name_rule: NameRule::Verbatim,
        server_filter: true,
    };

    const NODES: ResourceDescriptor = ResourceDescriptor {
        kind: "node",
        id_attr: "id",
        name_attr: "host",
        identity: IdentityRule::UuidOnly,
        name_rule: NameRule::DomainSuffix(".vstoragedomain"),
        server_filter: false,
    };

    const CLUSTERS: ResourceDescriptor = ResourceDescriptor {
        kind: "cluster",
        id_attr: "id",
        name_attr: "name",
        identity: IdentityRule::Numeric,
        name_rule: NameRule::Verbatim,
        server_filter: false,
    };

    const STORAGE_POLICIES: ResourceDescriptor = ResourceDescriptor {
        kind: "storage policy",
        id_attr: "id",
        name_attr: "name",
        identity: IdentityRule::Literal("default"),
        name_rule: NameRule::Verbatim,
        server_filter: true,
    };

    const UUID_A: &str = "0b6f7c3e-4a5d-4a1e-9a7e-2f3c4d5e6f70";
    const UUID_B: &str = "1c7a8d4f-5b6e-4b2f-8b8f-3a4d5e6f7081";

    fn volumes() -> Vec<Value> {
        vec![
            json!({"id": UUID_A, "name": "data"}),
            json!({"id": UUID_B, "name": "logs"}),
        ]
    }

    #[tokio::test]
    async fn test_uuid_fast_path_skips_listing() {
        let manager = FakeManager::new(VOLUMES, volumes());
        let item = find_resource(&manager, UUID_A).await.unwrap();
        assert_eq!(item["name"], "data");
        assert_eq!(manager.gets.load(Ordering::SeqCst), 1);
        assert_eq!(manager.lists.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_name_uses_server_filter() {
        let manager = FakeManager::new(VOLUMES, volumes());
        let item = find_resource(&manager, "logs").await.unwrap();
        assert_eq!(item["id"], UUID_B);
        assert_eq!(manager.gets.load(Ordering::SeqCst), 0);
        assert_eq!(
            manager.queries.lock().unwrap()[0],
            ListQuery::by_attribute("name", "logs").unlimited()
        );
    }

    #[tokio::test]
    async fn test_unknown_uuid_falls_back_to_listing() {
        let missing = "2d8b9e5a-6c7f-4c3a-9c9a-4b5e6f708192";
        let manager = FakeManager::new(VOLUMES, volumes());
        let err = find_resource(&manager, missing).await.unwrap_err();
        assert!(matches!(err, VinfraError::Command(_)));
        assert_eq!(manager.lists.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_not_found_names_kind_and_input() {
        let manager = FakeManager::new(VOLUMES, volumes());
        let err = find_resource(&manager, "nope").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("volume"));
        assert!(message.contains("'nope'"));
        assert!(message.contains("id"));
        assert_eq!(err.exit_code().code(), 2);
    }

    #[tokio::test]
    async fn test_ambiguous_name() {
        let mut items = volumes();
        items.push(json!({"id": "2d8b9e5a-6c7f-4c3a-9c9a-4b5e6f708192", "name": "data"}));
        let manager = FakeManager::new(VOLUMES, items);
        let err = find_resource(&manager, "data").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("More than one volume"));
        assert!(message.contains("name 'data'"));
        assert!(matches!(err, VinfraError::Command(_)));
    }

    #[tokio::test]
    async fn test_node_name_without_suffix() {
        let manager = FakeManager::new(
            NODES,
            vec![
                json!({"id": UUID_A, "host": "node1.vstoragedomain"}),
                json!({"id": UUID_B, "host": "node2.vstoragedomain"}),
            ],
        );
        let item = find_resource(&manager, "node2").await.unwrap();
        assert_eq!(item["id"], UUID_B);
        assert!(manager.queries.lock().unwrap()[0].is_empty());
    }

    #[tokio::test]
    async fn test_numeric_identity() {
        let manager = FakeManager::new(
            CLUSTERS,
            vec![json!({"id": 1, "name": "main"}), json!({"id": 2, "name": "backup"})],
        );
        let item = find_resource(&manager, "2").await.unwrap();
        assert_eq!(item["name"], "backup");
        assert_eq!(manager.lists.load(Ordering::SeqCst), 0);

        let item = find_resource(&manager, "main").await.unwrap();
        assert_eq!(item["id"], 1);
    }

    #[tokio::test]
    async fn test_find_resources_lists_once_and_keeps_order() {
        let manager = FakeManager::new(
            NODES,
            vec![
                json!({"id": UUID_A, "host": "node1.vstoragedomain"}),
                json!({"id": UUID_B, "host": "node2.vstoragedomain"}),
            ],
        );
        let found = find_resources(&manager, &["node2", UUID_A, "node1.vstoragedomain"])
            .await
            .unwrap();
        let ids: Vec<&Value> = found.iter().map(|item| &item["id"]).collect();
        assert_eq!(ids, vec![&json!(UUID_B), &json!(UUID_A), &json!(UUID_A)]);
        assert_eq!(manager.lists.load(Ordering::SeqCst), 1);
        assert_eq!(manager.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_find_resources_fails_on_unknown_reference() {
        let manager = FakeManager::new(NODES, vec![json!({"id": UUID_A, "host": "node1.vstoragedomain"})]);
        let err = find_resources(&manager, &["node1", "node9"]).await.unwrap_err();
        assert!(err.to_string().contains("'node9'"));
    }

    #[tokio::test]
    async fn test_find_resources_with_server_filter() {
        let manager = FakeManager::new(VOLUMES, volumes());
        let found = find_resources(&manager, &["logs", "data"]).await.unwrap();
        assert_eq!(found[0]["name"], "logs");
        assert_eq!(found[1]["name"], "data");
        assert_eq!(manager.lists.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_literal_identity_resolves_without_listing() {
        let manager = FakeManager::new(
            STORAGE_POLICIES,
            vec![
                json!({"id": "default", "name": "Default policy"}),
                json!({"id": UUID_A, "name": "gold"}),
            ],
        );
        let item = find_resource(&manager, "default").await.unwrap();
        assert_eq!(item["name"], "Default policy");
        assert_eq!(manager.gets.load(Ordering::SeqCst), 1);
        assert_eq!(manager.lists.load(Ordering::SeqCst), 0);

        let item = find_resource(&manager, "gold").await.unwrap();
        assert_eq!(item["id"], UUID_A);
        assert_eq!(manager.gets.load(Ordering::SeqCst), 1);
        assert_eq!(manager.lists.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_find_resources_rejects_shared_host() {
        let manager = FakeManager::new(
            NODES,
            vec![
                json!({"id": UUID_A, "host": "node1.vstoragedomain"}),
                json!({"id": UUID_B, "host": "node1.vstoragedomain"}),
            ],
        );
        let err = find_resources(&manager, &["node1"]).await.unwrap_err();
        assert!(matches!(err, VinfraError::Command(_)));
        let message = err.to_string();
        assert!(message.contains("More than one node"));
        assert!(message.contains("host 'node1'"));
        assert_eq!(manager.lists.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_login_failure_during_lookup_is_not_swallowed() {
        let manager = FakeManager::new(VOLUMES, volumes()).failing_gets(|| {
            VinfraError::Authentication("Login failed: Invalid credentials".to_string())
        });
        let err = find_resource(&manager, UUID_A).await.unwrap_err();
        assert!(matches!(err, VinfraError::Authentication(ref m) if m.contains("Invalid credentials")));
        assert_eq!(manager.lists.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_connection_failure_during_lookup_is_not_swallowed() {
        let manager = FakeManager::new(CLUSTERS, vec![json!({"id": 1, "name": "main"})])
            .failing_gets(|| VinfraError::Connection("connection refused".to_string()));
        let err = find_resource(&manager, "1").await.unwrap_err();
        assert_eq!(err.exit_code().code(), 101);
        assert_eq!(manager.lists.load(Ordering::SeqCst), 0);
    }
}
