mod ranking;
mod session;

pub use ranking::RankingError;
pub use session::SessionError;
