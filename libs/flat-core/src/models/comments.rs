//! Project comments and reactions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Author snapshot stored with a comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentAuthor {
    pub name: String,
    pub email: Option<String>,
}

/// A user who reacted with an emoji
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionUser {
    pub user_id: String,
    pub name: String,
}

/// File attached to a comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub url: String,
    pub size: u64,
    pub content_type: Option<String>,
}

/// Threaded project comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub project_id: String,
    pub user_id: String,
    pub author: CommentAuthor,
    pub content: String,
    /// Parent comment for replies
    pub parent_id: Option<String>,
    /// Emoji → reacting users
    #[serde(default)]
    pub reactions: BTreeMap<String, Vec<ReactionUser>>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

define_patch! {
    /// Partial update for [`Comment`]
    pub struct CommentPatch for Comment {
        content: String,
        parent_id: Option<String>,
        reactions: BTreeMap<String, Vec<ReactionUser>>,
        attachments: Vec<Attachment>,
    }
}

/// Input for creating a comment; the author snapshot is filled from the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub project_id: String,
    pub user_id: String,
    pub content: String,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl CreateCommentRequest {
    #[must_use]
    pub fn new(
        project_id: impl Into<String>,
        user_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            user_id: user_id.into(),
            content: content.into(),
            parent_id: None,
            attachments: Vec::new(),
        }
    }

    #[must_use]
    pub fn reply_to(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}
