// App state for Axum server
use std::sync::Arc;

use character_votes_flow::{IdentityProvider, RankingBoard, RankingRefresher, SessionRegistry};

#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub sessions: Arc<SessionRegistry>,
    pub board: Arc<RankingBoard>,
    pub refresher: Arc<RankingRefresher>,
    pub cors_origins: Arc<Vec<String>>,
}
