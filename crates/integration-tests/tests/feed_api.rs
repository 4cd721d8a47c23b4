//! Integration tests for the health feed API: posts, likes, comments and
//! visitor feedback.

use axum::http::{Method, StatusCode};
use pharmaguard_integration_tests::TestContext;
use serde_json::json;

// =============================================================================
// Post administration
// =============================================================================

#[tokio::test]
async fn test_create_post_requires_admin() {
    let ctx = TestContext::new();
    let body = json!({ "title": "Canicule", "body": "Buvez de l'eau." });

    let response = ctx.post_json("/api/admin/posts", &body).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["success"], false);

    let listing = ctx.get("/api/posts").await;
    assert_eq!(listing.body.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_created_posts_listed_newest_first() {
    let ctx = TestContext::new();
    ctx.create_post("Grippe saisonnière").await;
    ctx.create_post("Canicule").await;

    let response = ctx.get("/api/posts").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body[0]["title"], "Canicule");
    assert_eq!(response.body[1]["title"], "Grippe saisonnière");
    assert_eq!(response.body[0]["likes"], 0);
}

#[tokio::test]
async fn test_blank_title_rejected() {
    let ctx = TestContext::new();
    let response = ctx
        .admin(
            Method::POST,
            "/api/admin/posts",
            Some(json!({ "title": "  ", "body": "Texte" }).to_string()),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message(), "title cannot be empty");
}

#[tokio::test]
async fn test_malformed_post_body_rejected_with_json_error() {
    let ctx = TestContext::new();
    let response = ctx
        .admin(Method::POST, "/api/admin/posts", Some("{\"title\":".to_string()))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
}

#[tokio::test]
async fn test_scheduled_post_hidden_until_cleared() {
    let ctx = TestContext::new();
    let created = ctx
        .admin(
            Method::POST,
            "/api/admin/posts",
            Some(
                json!({
                    "title": "Campagne de vaccination",
                    "body": "Bientôt disponible.",
                    "publish_at": "2999-01-01T00:00:00Z"
                })
                .to_string(),
            ),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = created.body["id"].clone();

    assert_eq!(ctx.get("/api/posts").await.body.as_array().map(Vec::len), Some(0));

    // Omitting publish_at keeps the schedule.
    let kept = ctx
        .admin(
            Method::PUT,
            &format!("/api/admin/posts/{id}"),
            Some(json!({ "title": "Vaccination", "body": "Bientôt." }).to_string()),
        )
        .await;
    assert_eq!(kept.status, StatusCode::OK);
    assert_eq!(kept.body["publish_at"], "2999-01-01T00:00:00Z");
    assert_eq!(ctx.get("/api/posts").await.body.as_array().map(Vec::len), Some(0));

    // An explicit null publishes immediately.
    let cleared = ctx
        .admin(
            Method::PUT,
            &format!("/api/admin/posts/{id}"),
            Some(json!({ "title": "Vaccination", "body": "Disponible.", "publish_at": null }).to_string()),
        )
        .await;
    assert_eq!(cleared.status, StatusCode::OK);

    let listing = ctx.get("/api/posts").await;
    assert_eq!(listing.body[0]["title"], "Vaccination");
}

#[tokio::test]
async fn test_update_missing_post_is_not_found() {
    let ctx = TestContext::new();
    let response = ctx
        .admin(
            Method::PUT,
            "/api/admin/posts/999",
            Some(json!({ "title": "x", "body": "y" }).to_string()),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.message(), "Post 999 not found");
}

#[tokio::test]
async fn test_delete_post_is_idempotent() {
    let ctx = TestContext::new();
    let id = ctx.create_post("Allergies").await;

    let first = ctx
        .admin(Method::DELETE, &format!("/api/admin/posts/{id}"), None)
        .await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.message(), "Post deleted");

    let second = ctx
        .admin(Method::DELETE, &format!("/api/admin/posts/{id}"), None)
        .await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.message(), "Post already deleted");

    assert_eq!(ctx.get("/api/posts").await.body.as_array().map(Vec::len), Some(0));
}

// =============================================================================
// Likes
// =============================================================================

#[tokio::test]
async fn test_like_and_unlike() {
    let ctx = TestContext::new();
    let id = ctx.create_post("Canicule").await;
    let uri = format!("/api/posts/{id}/likes");

    let liked = ctx.request(Method::POST, &uri, None, None).await;
    assert_eq!(liked.status, StatusCode::OK);
    assert_eq!(liked.body["likes"], 1);

    ctx.request(Method::POST, &uri, None, None).await;
    assert_eq!(ctx.get("/api/posts").await.body[0]["likes"], 2);

    ctx.request(Method::DELETE, &uri, None, None).await;
    ctx.request(Method::DELETE, &uri, None, None).await;
    let floor = ctx.request(Method::DELETE, &uri, None, None).await;
    assert_eq!(floor.status, StatusCode::OK);
    assert_eq!(floor.body["likes"], 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_likes_are_all_counted() {
    let ctx = TestContext::new();
    let id = ctx.create_post("Canicule").await;
    let uri = format!("/api/posts/{id}/likes");

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..50 {
        let ctx = ctx.clone();
        let uri = uri.clone();
        tasks.spawn(async move { ctx.request(Method::POST, &uri, None, None).await.status });
    }
    while let Some(status) = tasks.join_next().await {
        assert_eq!(status.ok(), Some(StatusCode::OK));
    }

    assert_eq!(ctx.get("/api/posts").await.body[0]["likes"], 50);
}

#[tokio::test]
async fn test_like_missing_post() {
    let ctx = TestContext::new();
    let response = ctx
        .request(Method::POST, "/api/posts/42/likes", None, None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_numeric_post_id_rejected() {
    let ctx = TestContext::new();
    let response = ctx
        .request(Method::POST, "/api/posts/abc/likes", None, None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
}

// =============================================================================
// Comments
// =============================================================================

#[tokio::test]
async fn test_comments_oldest_first() {
    let ctx = TestContext::new();
    let id = ctx.create_post("Canicule").await;
    let uri = format!("/api/posts/{id}/comments");

    let first = ctx.post_json(&uri, &json!({ "body": "Merci !" })).await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["body"], "Merci !");
    ctx.post_json(&uri, &json!({ "body": "Très utile" })).await;

    let listing = ctx.get(&uri).await;
    assert_eq!(listing.status, StatusCode::OK);
    assert_eq!(listing.body[0]["body"], "Merci !");
    assert_eq!(listing.body[1]["body"], "Très utile");
}

#[tokio::test]
async fn test_comment_length_enforced() {
    let ctx = TestContext::new();
    let id = ctx.create_post("Canicule").await;
    let uri = format!("/api/posts/{id}/comments");

    let too_long = ctx.post_json(&uri, &json!({ "body": "a".repeat(301) })).await;
    assert_eq!(too_long.status, StatusCode::BAD_REQUEST);
    assert_eq!(too_long.message(), "comment must be at most 300 characters");

    let at_limit = ctx.post_json(&uri, &json!({ "body": "é".repeat(300) })).await;
    assert_eq!(at_limit.status, StatusCode::CREATED);

    let empty = ctx.post_json(&uri, &json!({ "body": "" })).await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    assert_eq!(ctx.get(&uri).await.body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_comment_on_missing_post() {
    let ctx = TestContext::new();
    let response = ctx
        .post_json("/api/posts/77/comments", &json!({ "body": "Bonjour" }))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.message(), "Post 77 not found");
}

// =============================================================================
// Feedback
// =============================================================================

#[tokio::test]
async fn test_feedback_accepted() {
    let ctx = TestContext::new();

    let review = ctx
        .post_json(
            "/api/feedback",
            &json!({ "kind": "avis", "content": "Application très pratique." }),
        )
        .await;
    assert_eq!(review.status, StatusCode::CREATED);
    assert_eq!(review.body["success"], true);

    let suggestion = ctx
        .post_json(
            "/api/feedback",
            &json!({ "kind": "suggestion", "content": "Ajouter une carte des gardes." }),
        )
        .await;
    assert_eq!(suggestion.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_feedback_validation() {
    let ctx = TestContext::new();

    let short = ctx
        .post_json("/api/feedback", &json!({ "kind": "review", "content": "Bien" }))
        .await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);
    assert_eq!(short.message(), "feedback must be at least 10 characters");

    let unknown_kind = ctx
        .post_json(
            "/api/feedback",
            &json!({ "kind": "complaint", "content": "Ceci est un message." }),
        )
        .await;
    assert_eq!(unknown_kind.status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown_kind.body["success"], false);
}
