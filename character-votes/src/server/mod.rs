// Server module - HTTP server setup and routing
pub mod handlers;
pub mod state;
pub mod views;

use axum::http::{HeaderValue, Method, header};
use axum::{
    Router,
    routing::{get, put},
};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use self::state::AppState;

/// Create the Axum application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let cors = create_cors_layer(&state.cors_origins);

    Router::new()
        .route("/", get(handlers::active_tab))
        .route("/tab/:tab", put(handlers::select_tab))
        .route("/vote", get(handlers::vote).post(handlers::cast_vote))
        .route("/statistics", get(handlers::statistics))
        .route("/statistics/events", get(handlers::statistics_events))
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS layer allowing the configured browser origins.
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Run the server on the specified address until Ctrl-C.
pub async fn run_server(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    info!("Server listening on {}", addr);
    info!("- Vote endpoint: http://{}/vote", addr);
    info!("- Statistics endpoint: http://{}/statistics", addr);
    info!("- Health endpoint: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use character_votes_flow::{
        IdentityProvider, RankingBoard, RankingRefresher, SessionRegistry,
    };
    use character_votes_repository::InMemoryVoteStore;
    use character_votes_shared::types::{
        Catalog, Character, CharacterKey, UserId, Vote, VoteType,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::auth::JwtIdentityProvider;
    use crate::auth::test_support::{SECRET, settings, token_for};

    struct TestApp {
        app: Router,
        store: Arc<InMemoryVoteStore>,
    }

    async fn test_app(characters: Vec<Character>, votes: Vec<Vote>) -> TestApp {
        let catalog = Arc::new(Catalog::new(characters));
        let store = Arc::new(InMemoryVoteStore::with_votes(votes));
        let identity: Arc<dyn IdentityProvider> =
            Arc::new(JwtIdentityProvider::new(&settings(None)));
        let sessions = Arc::new(SessionRegistry::new(Arc::clone(&catalog), store.clone()));
        let board = Arc::new(RankingBoard::new());
        let refresher = Arc::new(
            RankingRefresher::spawn(catalog, store.clone(), Arc::clone(&board))
                .await
                .unwrap(),
        );

        let state = AppState {
            identity,
            sessions,
            board,
            refresher,
            cors_origins: Arc::new(vec!["http://localhost:5173".to_string()]),
        };
        TestApp {
            app: create_app(state),
            store,
        }
    }

    fn characters() -> Vec<Character> {
        vec![
            Character::new("Walter", "White", "https://img.test/1.png"),
            Character::new("Jesse", "Pinkman", "https://img.test/2.png"),
            Character::new("Saul", "Goodman", "https://img.test/3.png"),
        ]
    }

    fn bearer(user: &str) -> String {
        format!("Bearer {}", token_for(user, SECRET, 3600, None))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_vote(vote_type: &str, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/vote")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder
            .body(Body::from(format!(r#"{{"voteType":"{vote_type}"}}"#)))
            .unwrap()
    }

    fn put_tab(tab: &str, auth: &str) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri(format!("/tab/{tab}"))
            .header(header::AUTHORIZATION, auth)
            .body(Body::empty())
            .unwrap()
    }

    async fn wait_for_votes(store: &InMemoryVoteStore, expected: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while store.len() < expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("vote was not written to the store");
    }

    #[tokio::test]
    async fn test_health_check() {
        let test = test_app(characters(), vec![]).await;
        let response = test.app.clone().oneshot(get("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_signed_out_vote_view_offers_sign_in() {
        let test = test_app(characters(), vec![]).await;

        let (status, body) = send(&test.app, get("/vote", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "signed_out");
        assert_eq!(body["affordances"]["signInUrl"], "/sign-in");
    }

    #[tokio::test]
    async fn test_invalid_token_is_treated_as_signed_out() {
        let test = test_app(characters(), vec![]).await;

        let (status, body) = send(&test.app, get("/vote", Some("Bearer garbage"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "signed_out");
    }

    #[tokio::test]
    async fn test_signed_out_cannot_vote() {
        let test = test_app(characters(), vec![]).await;

        let (status, body) = send(&test.app, post_vote("like", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], "error");
        assert!(test.store.is_empty());
    }

    #[tokio::test]
    async fn test_first_view_skips_already_voted_characters() {
        let test = test_app(
            characters(),
            vec![Vote::new(
                CharacterKey::from("Walter-White"),
                VoteType::Like,
                UserId::from("u1"),
            )],
        )
        .await;

        let (status, body) = send(&test.app, get("/vote", Some(&bearer("u1")))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "in_progress");
        assert_eq!(body["position"], 1);
        assert_eq!(body["total"], 3);
        assert_eq!(body["character"]["key"], "Jesse-Pinkman");
    }

    #[tokio::test]
    async fn test_vote_advances_and_is_written() {
        let test = test_app(characters(), vec![]).await;
        let auth = bearer("u1");

        let (status, body) = send(&test.app, post_vote("like", Some(&auth))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "in_progress");
        assert_eq!(body["character"]["key"], "Jesse-Pinkman");

        wait_for_votes(&test.store, 1).await;

        let (_, body) = send(&test.app, get("/vote", Some(&auth))).await;
        assert_eq!(body["position"], 1);
    }

    #[tokio::test]
    async fn test_last_vote_completes_then_rejects_more() {
        let test = test_app(
            vec![Character::new("Walter", "White", "https://img.test/1.png")],
            vec![],
        )
        .await;
        let auth = bearer("u1");

        let (status, body) = send(&test.app, post_vote("dislike", Some(&auth))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "complete");

        let (status, body) = send(&test.app, post_vote("like", Some(&auth))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_unknown_vote_type_is_rejected() {
        let test = test_app(characters(), vec![]).await;

        let response = test
            .app
            .clone()
            .oneshot(post_vote("meh", Some(&bearer("u1"))))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
        assert!(test.store.is_empty());
    }

    #[tokio::test]
    async fn test_statistics_reflect_votes() {
        let test = test_app(
            characters(),
            vec![
                Vote::new(CharacterKey::from("Walter-White"), VoteType::Like, UserId::from("u1")),
                Vote::new(CharacterKey::from("Walter-White"), VoteType::Like, UserId::from("u2")),
                Vote::new(CharacterKey::from("Saul-Goodman"), VoteType::Dislike, UserId::from("u1")),
            ],
        )
        .await;

        let (status, body) = send(&test.app, get("/statistics", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["loading"], false);
        assert_eq!(body["error"], Value::Null);
        assert_eq!(body["beloved"][0]["firstName"], "Walter");
        assert_eq!(body["beloved"][0]["score"], 2);
        assert_eq!(body["hated"][0]["firstName"], "Saul");
        assert_eq!(body["hated"][0]["score"], -1);
        assert_eq!(body["neutral"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tab_selection_is_remembered() {
        let test = test_app(characters(), vec![]).await;
        let auth = bearer("u1");

        let (status, body) = send(&test.app, put_tab("statistics", &auth)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tab"], "statistics");
        assert_eq!(body["view"]["loading"], false);

        let (_, body) = send(&test.app, get("/", Some(&auth))).await;
        assert_eq!(body["tab"], "statistics");

        let (_, body) = send(&test.app, put_tab("vote", &auth)).await;
        assert_eq!(body["tab"], "vote");
        assert_eq!(body["view"]["status"], "in_progress");
    }

    #[tokio::test]
    async fn test_unknown_tab_is_not_found() {
        let test = test_app(characters(), vec![]).await;

        let (status, _) = send(&test.app, put_tab("settings", &bearer("u1"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_cors_layer_skips_invalid_origins() {
        // Must not panic on a header value with a newline in it.
        let _ = create_cors_layer(&["http://localhost:5173".to_string(), "bad\norigin".to_string()]);
    }
}
