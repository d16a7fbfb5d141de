use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime, Document};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Post entity as persisted in the `posts` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub content: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    pub author: ObjectId,
}

/// Request structure for creating a new post
///
/// Every field is optional at the HTTP boundary; required-field
/// enforcement happens in the store layer, not in the handlers.
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

/// Request structure for updating a post
///
/// The fields form an exact-match query document; whichever post matches
/// is the one rewritten.
#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

/// JSON shape returned to HTTP callers, with object ids rendered as hex
#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub date: DateTime<Utc>,
    pub author: String,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        PostResponse {
            id: post.id.to_hex(),
            title: post.title,
            content: post.content,
            date: post.date,
            author: post.author.to_hex(),
        }
    }
}

impl CreatePostRequest {
    /// Convert to a Post entity with a generated id and defaulted timestamp.
    ///
    /// Missing or empty `title`/`content`, a missing `author`, or an
    /// `author` that is not a valid object id all fail as persistence
    /// errors, the same way a schema-level write rejection would.
    pub fn into_post(self) -> Result<Post, ApiError> {
        let title = require_text(self.title, "title")?;
        let content = require_text(self.content, "content")?;

        let author = self
            .author
            .ok_or_else(|| ApiError::persistence("required field `author` is missing"))?;
        let author = ObjectId::parse_str(&author).map_err(|_| {
            ApiError::persistence(format!("`author` is not a valid object id: {}", author))
        })?;

        Ok(Post {
            id: ObjectId::new(),
            title,
            content,
            date: self.date.unwrap_or_else(Utc::now),
            author,
        })
    }
}

impl UpdatePostRequest {
    /// Build the exact-match query document for this update.
    ///
    /// Only fields present in the request become query clauses. Identifier
    /// fields must parse as object ids.
    pub fn filter(&self) -> Result<Document, ApiError> {
        let mut filter = Document::new();

        if let Some(ref id) = self.id {
            let oid = ObjectId::parse_str(id)
                .map_err(|_| ApiError::persistence(format!("malformed post id: {}", id)))?;
            filter.insert("_id", oid);
        }

        if let Some(ref title) = self.title {
            filter.insert("title", title.clone());
        }

        if let Some(ref content) = self.content {
            filter.insert("content", content.clone());
        }

        if let Some(ref author) = self.author {
            let oid = ObjectId::parse_str(author)
                .map_err(|_| ApiError::persistence(format!("malformed author id: {}", author)))?;
            filter.insert("author", oid);
        }

        if let Some(date) = self.date {
            filter.insert("date", BsonDateTime::from_chrono(date));
        }

        Ok(filter)
    }
}

fn require_text(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(text) if !text.is_empty() => Ok(text),
        Some(_) => Err(ApiError::persistence(format!(
            "required field `{}` is empty",
            field
        ))),
        None => Err(ApiError::persistence(format!(
            "required field `{}` is missing",
            field
        ))),
    }
}
