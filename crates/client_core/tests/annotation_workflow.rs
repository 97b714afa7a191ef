use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use client_core::{
    AnnotationForm, AspectField, FormStep, HttpAuthClient, HttpClientConfig, HttpPostsClient,
    MemoryTokenStore, PostsApi, ReviewPhase, ReviewSession, SaveOutcome, Session,
    VerificationQueue,
};
use serde_json::{json, Value};
use shared::domain::{PostId, PostStatus, Sentiment};
use tokio::net::TcpListener;

/// Minimal stateful stand-in for the annotation backend.
#[derive(Clone, Default)]
struct Backend {
    posts: Arc<Mutex<Vec<Value>>>,
}

impl Backend {
    fn posts_with_status(&self, status: &str) -> Vec<Value> {
        self.posts
            .lock()
            .expect("posts")
            .iter()
            .filter(|post| post["status"] == status)
            .cloned()
            .collect()
    }
}

fn signed_in(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some("JWT workflow-token")
}

fn denied() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Authentication credentials were not provided."})),
    )
        .into_response()
}

async fn obtain_token(Json(body): Json<Value>) -> Response {
    if body["username"] == "ana" && body["password"] == "secret" {
        Json(json!({"access": "workflow-token", "refresh": "r"})).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "No active account found with the given credentials"})),
        )
            .into_response()
    }
}

async fn me(headers: HeaderMap) -> Response {
    if !signed_in(&headers) {
        return denied();
    }
    Json(json!({"id": 1, "username": "ana", "email": "ana@example.com"})).into_response()
}

async fn create_post(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if !signed_in(&headers) {
        return denied();
    }
    let mut posts = backend.posts.lock().expect("posts");
    let id = posts.len() as i64 + 1;
    body["id"] = json!(id);
    body["status"] = json!("unreviewed");
    body["source"] = json!(body["source"].as_str().unwrap_or_default().to_uppercase());
    if let Some(comments) = body["comments"].as_array_mut() {
        for (index, comment) in comments.iter_mut().enumerate() {
            comment["id"] = json!(id * 10 + index as i64);
        }
    }
    posts.push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn collection_action(
    State(backend): State<Backend>,
    Path(action): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !signed_in(&headers) {
        return denied();
    }
    match action.as_str() {
        "unreviewed" | "reviewed" => Json(backend.posts_with_status(&action)).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn update_post(
    State(backend): State<Backend>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !signed_in(&headers) {
        return denied();
    }
    let mut posts = backend.posts.lock().expect("posts");
    let Some(stored) = posts.iter_mut().find(|post| post["id"] == id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    for field in ["caption", "source", "comments"] {
        stored[field] = body[field].clone();
    }
    Json(stored.clone()).into_response()
}

async fn review_post(
    State(backend): State<Backend>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    if !signed_in(&headers) {
        return denied();
    }
    let mut posts = backend.posts.lock().expect("posts");
    let Some(stored) = posts.iter_mut().find(|post| post["id"] == id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if stored["status"] == "reviewed" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Post is already reviewed"})),
        )
            .into_response();
    }
    stored["status"] = json!("reviewed");
    stored["reviewed_by"] = json!(1);
    Json(stored.clone()).into_response()
}

async fn spawn_backend(backend: Backend) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new()
        .route("/auth/jwt/create/", post(obtain_token))
        .route("/auth/users/me/", get(me))
        .route("/api/posts/", post(create_post))
        .route(
            "/api/posts/:id/",
            get(collection_action).put(update_post),
        )
        .route("/api/posts/:id/review/", post(review_post))
        .with_state(backend);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn fill(form: &mut AnnotationForm, caption: &str, comment_text: &str, aspect: &str) {
    form.set_caption(caption);
    form.set_source("@shop");
    let comment = form.draft().comments[0].id;
    let aspect_id = form.draft().comments[0].aspects[0].id;
    form.set_comment_text(comment, comment_text);
    form.set_comment_general_sentiment(comment, Sentiment::Positive);
    form.set_aspect_field(comment, aspect_id, AspectField::Name(aspect.to_string()));
    form.set_aspect_field(
        comment,
        aspect_id,
        AspectField::Sentiment(Sentiment::Positive),
    );
}

#[tokio::test]
async fn annotate_review_and_approve_against_backend() {
    let backend = Backend::default();
    let server_url = spawn_backend(backend.clone()).await;
    let config =
        HttpClientConfig::new(&format!("{server_url}/api"), &server_url).expect("config");
    let session = Arc::new(Session::new(
        Arc::new(HttpAuthClient::new(&config).expect("auth client")),
        Box::new(MemoryTokenStore::default()),
    ));
    let posts: Arc<dyn PostsApi> =
        Arc::new(HttpPostsClient::new(&config, Arc::clone(&session)).expect("posts client"));

    session.login("ana", "secret").await.expect("login");
    assert!(session.is_authenticated());

    // Annotate two posts through the stepped form.
    let mut form = AnnotationForm::new();
    for (caption, text, aspect) in [
        ("Spring sale", "Love it", "price"),
        ("New arrivals", "Nice", "quality"),
    ] {
        fill(&mut form, caption, text, aspect);
        assert_eq!(form.next(), Ok(FormStep::Comments));
        assert_eq!(form.next(), Ok(FormStep::Review));
        let created = form.submit(&*posts).await.expect("submit");
        assert_eq!(created.source, "@SHOP");
        assert_eq!(created.status, PostStatus::Unreviewed);
        assert_eq!(form.step(), FormStep::Details);
    }

    let mut queue = VerificationQueue::new();
    queue.refresh(&*posts).await.expect("refresh");
    assert_eq!(queue.unreviewed().len(), 2);
    assert!(queue.reviewed().is_empty());

    // Correct the first post: two edits, one of them undone.
    let review = ReviewSession::new();
    review.load(queue.take_for_review(PostId(1)).expect("listed"));
    review.edit(|post| post.comments[0].general_sentiment = Sentiment::Negative);
    review.edit(|post| post.caption = "typo".to_string());
    review.undo();
    assert!(review.can_redo());

    let SaveOutcome::Persisted {
        record,
        marked_reviewed,
    } = review.save(&*posts).await.expect("save")
    else {
        panic!("expected the edit to be persisted");
    };
    assert!(marked_reviewed);
    assert_eq!(review.phase(), ReviewPhase::Saved);
    assert_eq!(record.caption, "Spring sale");
    assert_eq!(record.comments[0].general_sentiment, Sentiment::Negative);
    queue.record_saved(record);

    // Approve the second one unchanged.
    let approved = queue.approve(&*posts, PostId(2)).await.expect("approve");
    assert!(approved.is_reviewed());
    assert!(queue.unreviewed().is_empty());

    queue.refresh(&*posts).await.expect("refresh");
    let reviewed: Vec<_> = queue.reviewed().iter().map(|post| post.id).collect();
    assert_eq!(reviewed, vec![PostId(1), PostId(2)]);

    let err = queue
        .approve(&*posts, PostId(2))
        .await
        .expect_err("already reviewed");
    assert!(err.to_string().contains("Post is already reviewed"), "{err}");

    session.logout();
    let err = posts.list_reviewed_posts().await.expect_err("signed out");
    assert!(err.to_string().contains("Authentication credentials"), "{err}");
}
