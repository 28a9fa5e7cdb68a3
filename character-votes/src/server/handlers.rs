// HTTP request handlers
use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use character_votes_flow::{RankingSnapshot, SessionController, SessionState, SignInState, Tab};
use character_votes_shared::types::VoteType;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio_stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, error, info};

use crate::errors::AppError;
use crate::server::state::AppState;
use crate::server::views::{TabView, VoteView};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub vote_type: VoteType,
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "Character votes server is running")
}

/// View of the caller's active tab.
pub async fn active_tab(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TabView>, AppError> {
    let (_, controller) = controller_for(&state, &headers).await;
    let mut controller = controller.lock().await;
    let view = match controller.active_tab() {
        Tab::Vote => TabView::Vote(vote_view(&state, &mut controller).await?),
        Tab::Statistics => TabView::Statistics(state.board.snapshot()),
    };
    Ok(Json(view))
}

/// Switches the caller's active tab.
///
/// Opening the statistics tab fetches the rankings, the same as loading it directly.
pub async fn select_tab(
    State(state): State<AppState>,
    Path(tab): Path<String>,
    headers: HeaderMap,
) -> Result<Json<TabView>, AppError> {
    let tab: Tab = tab.parse().map_err(AppError::UnknownTab)?;
    let (_, controller) = controller_for(&state, &headers).await;
    let mut controller = controller.lock().await;
    controller.select_tab(tab);
    debug!(tab = %tab, "Tab selected");

    let view = match tab {
        Tab::Vote => TabView::Vote(vote_view(&state, &mut controller).await?),
        Tab::Statistics => {
            drop(controller);
            TabView::Statistics(refreshed_statistics(&state).await)
        }
    };
    Ok(Json(view))
}

/// Vote tab view.
pub async fn vote(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<VoteView>, AppError> {
    let (_, controller) = controller_for(&state, &headers).await;
    let mut controller = controller.lock().await;
    Ok(Json(vote_view(&state, &mut controller).await?))
}

/// Casts a vote for the current character.
///
/// The session advances before the store answers. The insert runs on its own
/// task and its outcome is folded into the session when it lands; a schema
/// alert raised there shows up on the next vote view.
pub async fn cast_vote(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CastVoteRequest>,
) -> Result<Json<VoteView>, AppError> {
    let (sign_in, controller) = controller_for(&state, &headers).await;
    match sign_in {
        SignInState::Loading => return Err(AppError::IdentityPending),
        SignInState::SignedOut => return Err(AppError::Unauthorized),
        SignInState::SignedIn(_) => {}
    }

    let (pending, store, view) = {
        let mut guard = controller.lock().await;
        ensure_votes_loaded(&mut guard).await?;
        let session = guard.vote_mut();
        let pending = session.begin_vote(request.vote_type)?;
        let store = session.store();
        let view = VoteView::render(session, state.identity.affordances());
        (pending, store, view)
    };

    info!(
        user_id = %pending.vote.user_id,
        character_key = %pending.vote.character_key,
        vote_type = %pending.vote.vote_type,
        "Vote cast"
    );

    tokio::spawn(async move {
        let result = store.insert_vote(&pending.vote).await;
        controller
            .lock()
            .await
            .vote_mut()
            .apply_outcome(&pending, result);
    });

    Ok(Json(view))
}

/// Statistics tab view, freshly fetched.
pub async fn statistics(State(state): State<AppState>) -> Json<RankingSnapshot> {
    Json(refreshed_statistics(&state).await)
}

/// Pushes a `rankings` event for every applied refresh, starting with the current one.
pub async fn statistics_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = WatchStream::new(state.board.subscribe()).map(|snapshot| {
        Ok(match Event::default().event("rankings").json_data(&snapshot) {
            Ok(event) => event,
            Err(e) => {
                error!(error = %e, "Failed to encode rankings event");
                Event::default().comment("encoding error")
            }
        })
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

async fn controller_for(
    state: &AppState,
    headers: &HeaderMap,
) -> (SignInState, Arc<Mutex<SessionController>>) {
    let sign_in = state.identity.resolve(bearer_token(headers)).await;
    let controller = state.sessions.controller(sign_in.clone()).await;
    (sign_in, controller)
}

async fn ensure_votes_loaded(controller: &mut SessionController) -> Result<(), AppError> {
    if controller.vote().state() == SessionState::AwaitingFirstIndex {
        controller.vote_mut().load_user_votes().await?;
    }
    Ok(())
}

async fn vote_view(
    state: &AppState,
    controller: &mut SessionController,
) -> Result<VoteView, AppError> {
    ensure_votes_loaded(controller).await?;
    Ok(VoteView::render(
        controller.vote_mut(),
        state.identity.affordances(),
    ))
}

async fn refreshed_statistics(state: &AppState) -> RankingSnapshot {
    state.refresher.refresh_now().await;
    state.board.snapshot()
}
