//! Global rankings: pure aggregation plus the push-driven refresh around it.
mod aggregate;
mod board;
mod refresher;

pub use aggregate::{compute_rankings, compute_scores, rank};
pub use board::{RankingBoard, RankingSnapshot, STATS_ERROR_MESSAGE};
pub use refresher::RankingRefresher;
