use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything a console operation can fail with, as seen by a view.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ConsoleError {
    #[error("{0}")]
    Authentication(String),
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("{0}")]
    Authorization(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

pub type ConsoleResult<T> = Result<T, ConsoleError>;

impl ConsoleError {
    pub fn validation(message: impl Into<String>) -> Self {
        ConsoleError::Validation(vec![message.into()])
    }

    /// Messages suitable for inline rendering next to a form.
    pub fn messages(&self) -> Vec<String> {
        match self {
            ConsoleError::Validation(messages) => messages.clone(),
            other => vec![other.to_string()],
        }
    }
}

/// Backend error body. FastAPI puts either a string or a list of field
/// errors under `detail`.
#[derive(Clone, Debug, Deserialize)]
pub struct BackendErrorBody {
    pub detail: Option<BackendDetail>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum BackendDetail {
    Message(String),
    Fields(Vec<FieldError>),
    Other(serde_json::Value),
}

#[derive(Clone, Debug, Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub loc: Vec<serde_json::Value>,
    pub msg: String,
}

impl FieldError {
    fn render(&self) -> String {
        // loc is ["body", "org_id"]; the leading segment is noise to a user.
        let field = self
            .loc
            .iter()
            .skip(1)
            .map(|part| match part {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".");
        if field.is_empty() {
            self.msg.clone()
        } else {
            format!("{field}: {}", self.msg)
        }
    }
}

impl BackendErrorBody {
    /// Parses a raw error body, falling back to the body text itself.
    pub fn messages(raw: &str) -> Vec<String> {
        let parsed = serde_json::from_str::<BackendErrorBody>(raw)
            .ok()
            .and_then(|body| body.detail);
        match parsed {
            Some(BackendDetail::Message(message)) => vec![message],
            Some(BackendDetail::Fields(fields)) => fields.iter().map(FieldError::render).collect(),
            Some(BackendDetail::Other(value)) => vec![value.to_string()],
            None if raw.trim().is_empty() => Vec::new(),
            None => vec![raw.trim().to_string()],
        }
    }
}
