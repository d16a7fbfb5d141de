// Post handlers
// HTTP handlers for the post resource

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::{
    db::PostStore,
    error::ApiError,
    models::post::{CreatePostRequest, PostResponse, UpdatePostRequest},
};

/// Create a new post
/// POST /posts
pub async fn create_post(
    State(store): State<Arc<dyn PostStore>>,
    Json(request): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = store.create_post(request).await?;

    info!("Successfully created post with id: {}", post.id.to_hex());
    Ok(Json(PostResponse::from(post)))
}

/// Update the post matching the request body
/// PUT /posts
///
/// Responds with the previous revision of the matched post; 404 when
/// nothing matched.
pub async fn update_post(
    State(store): State<Arc<dyn PostStore>>,
    Json(request): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    match store.update_post(request).await? {
        Some(post) => {
            info!("Successfully updated post with id: {}", post.id.to_hex());
            Ok(Json(PostResponse::from(post)))
        }
        None => Err(ApiError::NotFound("post")),
    }
}

/// Get post by ID
/// GET /posts/:id
pub async fn find_post(
    State(store): State<Arc<dyn PostStore>>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match store.find_post(&post_id).await? {
        Some(post) => Ok(Json(PostResponse::from(post))),
        None => Err(ApiError::NotFound("post")),
    }
}

/// Get all posts
/// GET /posts
pub async fn list_posts(
    State(store): State<Arc<dyn PostStore>>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = store.list_posts().await?;

    info!("Retrieved {} posts", posts.len());
    let responses: Vec<PostResponse> = posts.into_iter().map(PostResponse::from).collect();
    Ok(Json(responses))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::routing::{get, post, put};
    use axum::Router;
    use chrono::{TimeZone, Utc};
    use mongodb::bson::oid::ObjectId;
    use tower::ServiceExt;

    use crate::models::post::Post;

    /// Store double with one canned outcome shared by every operation,
    /// mirroring how the handlers only ever see error / none / some.
    struct StubStore {
        outcome: Result<Option<Post>, String>,
    }

    impl StubStore {
        fn returning(post: Post) -> Self {
            StubStore {
                outcome: Ok(Some(post)),
            }
        }

        fn missing() -> Self {
            StubStore { outcome: Ok(None) }
        }

        fn failing() -> Self {
            StubStore {
                outcome: Err("some error message".to_string()),
            }
        }
    }

    #[async_trait]
    impl PostStore for StubStore {
        async fn create_post(&self, _request: CreatePostRequest) -> Result<Post, ApiError> {
            match &self.outcome {
                Ok(Some(post)) => Ok(post.clone()),
                Ok(None) => Err(ApiError::persistence("stub has no post configured")),
                Err(message) => Err(ApiError::persistence(message.clone())),
            }
        }

        async fn update_post(
            &self,
            _request: UpdatePostRequest,
        ) -> Result<Option<Post>, ApiError> {
            match &self.outcome {
                Ok(found) => Ok(found.clone()),
                Err(message) => Err(ApiError::persistence(message.clone())),
            }
        }

        async fn find_post(&self, _id: &str) -> Result<Option<Post>, ApiError> {
            match &self.outcome {
                Ok(found) => Ok(found.clone()),
                Err(message) => Err(ApiError::persistence(message.clone())),
            }
        }

        async fn list_posts(&self) -> Result<Vec<Post>, ApiError> {
            match &self.outcome {
                Ok(Some(post)) => Ok(vec![post.clone()]),
                Ok(None) => Ok(Vec::new()),
                Err(message) => Err(ApiError::persistence(message.clone())),
            }
        }
    }

    fn router(store: StubStore) -> Router {
        let state: Arc<dyn PostStore> = Arc::new(store);
        Router::new()
            .route("/posts", post(create_post).put(update_post).get(list_posts))
            .route("/posts/:id", get(find_post))
            .with_state(state)
    }

    fn sample_post() -> Post {
        Post {
            id: ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap(),
            title: "My first test post".to_string(),
            content: "Random content".to_string(),
            date: Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap(),
            author: ObjectId::parse_str("507f191e810c19729de860ea").unwrap(),
        }
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_create_returns_created_post() {
        let request = json_request(
            "POST",
            "/posts",
            serde_json::json!({
                "author": "507f191e810c19729de860ea",
                "title": "My first test post",
                "content": "Random content"
            }),
        );

        let response = router(StubStore::returning(sample_post()))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], "507f1f77bcf86cd799439011");
        assert_eq!(body["title"], "My first test post");
        assert_eq!(body["content"], "Random content");
        assert_eq!(body["author"], "507f191e810c19729de860ea");
    }

    #[tokio::test]
    async fn test_create_returns_500_on_store_error() {
        let request = json_request(
            "POST",
            "/posts",
            serde_json::json!({
                "author": "507f191e810c19729de860ea",
                "title": "My first test post",
                "content": "Random content"
            }),
        );

        let response = router(StubStore::failing()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_update_returns_previous_post() {
        let request = json_request(
            "PUT",
            "/posts",
            serde_json::json!({
                "title": "My first test post",
                "content": "Random content"
            }),
        );

        let response = router(StubStore::returning(sample_post()))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["title"], "My first test post");
        assert_eq!(body["content"], "Random content");
        assert_eq!(body["author"], "507f191e810c19729de860ea");
    }

    #[tokio::test]
    async fn test_update_returns_404_when_nothing_matched() {
        let request = json_request(
            "PUT",
            "/posts",
            serde_json::json!({ "title": "No such post" }),
        );

        let response = router(StubStore::missing()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_update_returns_500_on_store_error() {
        let request = json_request(
            "PUT",
            "/posts",
            serde_json::json!({ "title": "My first test post" }),
        );

        let response = router(StubStore::failing()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_find_returns_post() {
        let request = Request::builder()
            .method("GET")
            .uri("/posts/507f1f77bcf86cd799439011")
            .body(Body::empty())
            .unwrap();

        let response = router(StubStore::returning(sample_post()))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], "507f1f77bcf86cd799439011");
        assert_eq!(body["title"], "My first test post");
    }

    #[tokio::test]
    async fn test_find_returns_404_for_absent_post() {
        let request = Request::builder()
            .method("GET")
            .uri("/posts/507f1f77bcf86cd799439011")
            .body(Body::empty())
            .unwrap();

        let response = router(StubStore::missing()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_find_returns_500_on_store_error() {
        let request = Request::builder()
            .method("GET")
            .uri("/posts/507f1f77bcf86cd799439011")
            .body(Body::empty())
            .unwrap();

        let response = router(StubStore::failing()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_list_returns_posts() {
        let request = Request::builder()
            .method("GET")
            .uri("/posts")
            .body(Body::empty())
            .unwrap();

        let response = router(StubStore::returning(sample_post()))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["title"], "My first test post");
    }

    #[tokio::test]
    async fn test_list_returns_empty_array() {
        let request = Request::builder()
            .method("GET")
            .uri("/posts")
            .body(Body::empty())
            .unwrap();

        let response = router(StubStore::missing()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_list_returns_500_on_store_error() {
        let request = Request::builder()
            .method("GET")
            .uri("/posts")
            .body(Body::empty())
            .unwrap();

        let response = router(StubStore::failing()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_bytes(response).await.is_empty());
    }
}
