use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::{ClientOptions, FindOptions, UpdateModifications};
use mongodb::{Client, Collection};
use tracing::{error, info};

use crate::config::Config;
use crate::error::ApiError;
use crate::models::post::{CreatePostRequest, Post, UpdatePostRequest};

/// Marker appended to the stored title on every update.
pub const EDITED_MARKER: &str = " (edited)";

/// Database name used when the connection string does not name one.
const DEFAULT_DATABASE: &str = "postdb";

/// Persistence seam for post documents.
///
/// Handlers depend on this trait rather than on the concrete database so
/// they can be exercised against a stub. Absence of a matching document is
/// `Ok(None)`, never an error; errors are reserved for database-level
/// failures.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Persist a new post built from the caller-supplied fields and return
    /// the stored entity, id and timestamp included.
    async fn create_post(&self, request: CreatePostRequest) -> Result<Post, ApiError>;

    /// Rewrite the title of the first post matching the request fields and
    /// return the document as it was before the update, or `None` when
    /// nothing matched.
    async fn update_post(&self, request: UpdatePostRequest) -> Result<Option<Post>, ApiError>;

    /// Look up a single post by its id.
    async fn find_post(&self, id: &str) -> Result<Option<Post>, ApiError>;

    /// All posts, newest first.
    async fn list_posts(&self) -> Result<Vec<Post>, ApiError>;
}

/// MongoDB-backed [`PostStore`] holding the handle to the `posts`
/// collection. The only type in the crate that talks to the database.
#[derive(Clone)]
pub struct Database {
    database: mongodb::Database,
    posts: Collection<Post>,
}

impl Database {
    /// Connect to the database named by the configured connection string
    /// and verify liveness before returning.
    pub async fn new(config: &Config) -> Result<Self, ApiError> {
        let options = ClientOptions::parse(&config.database_url)
            .await
            .map_err(|e| {
                error!("Failed to parse MongoDB connection string: {}", e);
                ApiError::persistence(format!("invalid connection string: {}", e))
            })?;

        let client = Client::with_options(options).map_err(|e| {
            error!("Failed to create MongoDB client: {}", e);
            ApiError::persistence(format!("client creation failed: {}", e))
        })?;

        let database = client
            .default_database()
            .unwrap_or_else(|| client.database(DEFAULT_DATABASE));
        let posts = database.collection::<Post>("posts");

        let db = Database { database, posts };
        db.ping().await?;
        info!("Database connection verified");

        Ok(db)
    }

    /// Round-trip a `ping` command to confirm the server is reachable.
    async fn ping(&self) -> Result<(), ApiError> {
        self.database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                error!("Database ping failed: {}", e);
                ApiError::persistence(format!("ping failed: {}", e))
            })?;

        Ok(())
    }
}

#[async_trait]
impl PostStore for Database {
    async fn create_post(&self, request: CreatePostRequest) -> Result<Post, ApiError> {
        let post = request.into_post()?;

        self.posts.insert_one(&post, None).await.map_err(|e| {
            error!("Failed to insert post: {}", e);
            ApiError::from(e)
        })?;

        info!("Created post with id: {}", post.id.to_hex());
        Ok(post)
    }

    async fn update_post(&self, request: UpdatePostRequest) -> Result<Option<Post>, ApiError> {
        let filter = request.filter()?;

        // find_one_and_update returns the pre-update document, so a
        // successful update hands back the previous revision.
        let previous = self
            .posts
            .find_one_and_update(filter, edited_title_update(), None)
            .await
            .map_err(|e| {
                error!("Failed to update post: {}", e);
                ApiError::from(e)
            })?;

        if let Some(ref post) = previous {
            info!("Updated post with id: {}", post.id.to_hex());
        }

        Ok(previous)
    }

    async fn find_post(&self, id: &str) -> Result<Option<Post>, ApiError> {
        let oid = ObjectId::parse_str(id)
            .map_err(|_| ApiError::persistence(format!("malformed post id: {}", id)))?;

        let post = self
            .posts
            .find_one(doc! { "_id": oid }, None)
            .await
            .map_err(|e| {
                error!("Failed to fetch post {}: {}", id, e);
                ApiError::from(e)
            })?;

        Ok(post)
    }

    async fn list_posts(&self) -> Result<Vec<Post>, ApiError> {
        let options = FindOptions::builder().sort(doc! { "date": -1 }).build();

        let cursor = self.posts.find(None, options).await.map_err(|e| {
            error!("Failed to list posts: {}", e);
            ApiError::from(e)
        })?;

        let posts = cursor.try_collect().await.map_err(|e| {
            error!("Failed to drain post cursor: {}", e);
            ApiError::from(e)
        })?;

        Ok(posts)
    }
}

/// Update applied by every `update_post` call: the new title is the stored
/// title plus the edited marker. A caller-supplied title only participates
/// in the query, never in the rewrite. Pipeline form keeps the
/// read-modify-write atomic.
fn edited_title_update() -> UpdateModifications {
    UpdateModifications::Pipeline(vec![doc! {
        "$set": { "title": { "$concat": ["$title", EDITED_MARKER] } }
    }])
}
