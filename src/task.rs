//! Backend tasks: asynchronous operations the portal runs on our behalf.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use strum::{Display, EnumString};

use crate::error::{Result, VinfraError};
use crate::session::{AuthSession, RequestOptions};

pub const TASKS_PATH: &str = "api/v2/tasks";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    #[strum(to_string = "pending", serialize = "queued")]
    Pending,
    #[strum(to_string = "running")]
    Running,
    #[strum(to_string = "success", serialize = "succeeded")]
    Success,
    #[strum(to_string = "error", serialize = "failed")]
    Error,
    #[strum(to_string = "canceled", serialize = "cancelled")]
    Canceled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Success | TaskState::Error | TaskState::Canceled
        )
    }
}

/// One observation of a task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStatus {
    pub id: String,
    pub state: TaskState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl TaskStatus {
    /// Build a status from the portal's task document
    pub fn from_value(id: &str, value: &Value) -> Result<TaskStatus> {
        let state = value
            .get("state")
            .or_else(|| value.get("status"))
            .and_then(Value::as_str)
            .ok_or_else(|| VinfraError::Client(format!("Task {} has no state", id)))?;
        let state = TaskState::from_str(state).map_err(|_| {
            VinfraError::Client(format!("Task {} has unknown state '{}'", id, state))
        })?;

        let details = ["details", "error", "message"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
            .map(str::to_string);

        Ok(TaskStatus {
            id: id.to_string(),
            state,
            progress: value.get("progress").and_then(Value::as_f64),
            result: value.get("result").filter(|r| !r.is_null()).cloned(),
            details,
        })
    }
}

#[async_trait]
pub trait Task: Send + Sync {
    fn id(&self) -> &str;

    async fn status(&self) -> Result<TaskStatus>;
}

/// Task tracked through `GET /api/v2/tasks/<id>`
pub struct RestTask {
    id: String,
    session: Arc<AuthSession>,
}

impl RestTask {
    pub fn new(session: Arc<AuthSession>, id: impl Into<String>) -> Self {
        RestTask {
            id: id.into(),
            session,
        }
    }

    /// The task started by a mutating request, if its response names one
    pub fn from_response(session: Arc<AuthSession>, response: &Value) -> Option<Self> {
        let id = match response.get("task_id")? {
            Value::String(id) => id.clone(),
            Value::Number(id) => id.to_string(),
            _ => return None,
        };
        Some(RestTask::new(session, id))
    }
}

#[async_trait]
impl Task for RestTask {
    fn id(&self) -> &str {
        &self.id
    }

    async fn status(&self) -> Result<TaskStatus> {
        let path = format!("{}/{}", TASKS_PATH, self.id);
        let value = self
            .session
            .get_json(&path, RequestOptions::default())
            .await?;
        TaskStatus::from_value(&self.id, &value)
    }
}
