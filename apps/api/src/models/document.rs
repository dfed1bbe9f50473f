use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Cv,
    JobSpec,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Cv => "cv",
            DocumentKind::JobSpec => "job_spec",
        }
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cv" => Ok(DocumentKind::Cv),
            "job_spec" => Ok(DocumentKind::JobSpec),
            other => Err(format!("unknown document kind '{other}'")),
        }
    }
}

/// An uploaded CV or job specification. `content` is already-extracted text.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub title: Option<String>,
    pub content: String,
    /// Absent until the document has been analyzed.
    pub analysis: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
