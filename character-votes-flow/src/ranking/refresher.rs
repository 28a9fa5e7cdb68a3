use std::sync::Arc;

use character_votes_repository::{VoteInserted, VoteStore};
use character_votes_shared::types::Catalog;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::errors::RankingError;
use crate::ranking::{RankingBoard, compute_rankings};

/// Keeps the [`RankingBoard`] current.
///
/// Refresh requests go through a queue of depth one: while a refresh is
/// pending, further requests are folded into it. Every store insert
/// notification requests a refresh, and every refresh refetches all votes and
/// recomputes the rankings from scratch.
pub struct RankingRefresher {
    catalog: Arc<Catalog>,
    store: Arc<dyn VoteStore>,
    board: Arc<RankingBoard>,
    trigger: mpsc::Sender<()>,
    worker: JoinHandle<()>,
    forwarder: JoinHandle<()>,
}

impl RankingRefresher {
    /// Subscribes to store inserts, starts the refresh worker and requests the
    /// initial load.
    pub async fn spawn(
        catalog: Arc<Catalog>,
        store: Arc<dyn VoteStore>,
        board: Arc<RankingBoard>,
    ) -> Result<Self, RankingError> {
        let inserts = store.subscribe_inserts().await?;
        let (trigger, requests) = mpsc::channel(1);

        let worker = tokio::spawn(run_worker(
            requests,
            Arc::clone(&catalog),
            Arc::clone(&store),
            Arc::clone(&board),
        ));
        let forwarder = tokio::spawn(forward_inserts(inserts, trigger.clone()));

        let refresher = Self {
            catalog,
            store,
            board,
            trigger,
            worker,
            forwarder,
        };
        refresher.request_refresh();
        info!("Ranking refresher started");
        Ok(refresher)
    }

    /// Queues a refresh unless one is already pending.
    pub fn request_refresh(&self) {
        request(&self.trigger);
    }

    /// Refreshes right away on the caller's task, bypassing the queue.
    ///
    /// Returns `false` if a newer refresh finished first and this result was dropped.
    pub async fn refresh_now(&self) -> bool {
        refresh_once(&self.catalog, self.store.as_ref(), &self.board).await
    }

    pub fn board(&self) -> &Arc<RankingBoard> {
        &self.board
    }
}

impl Drop for RankingRefresher {
    fn drop(&mut self) {
        self.forwarder.abort();
        self.worker.abort();
    }
}

fn request(trigger: &mpsc::Sender<()>) {
    match trigger.try_send(()) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(())) => {
            debug!("Ranking refresh already pending, coalescing");
        }
        Err(mpsc::error::TrySendError::Closed(())) => {
            warn!("Ranking refresh worker has stopped");
        }
    }
}

async fn refresh_once(catalog: &Catalog, store: &dyn VoteStore, board: &RankingBoard) -> bool {
    let sequence = board.begin();
    let result = match store.get_all_votes().await {
        Ok(votes) => {
            debug!(sequence, votes = votes.len(), "Recomputing rankings");
            Ok(compute_rankings(catalog, &votes))
        }
        Err(e) => {
            error!(sequence, error = %e, "Error fetching stats");
            Err(RankingError::from(e))
        }
    };
    board.apply(sequence, result)
}

async fn run_worker(
    mut requests: mpsc::Receiver<()>,
    catalog: Arc<Catalog>,
    store: Arc<dyn VoteStore>,
    board: Arc<RankingBoard>,
) {
    while requests.recv().await.is_some() {
        refresh_once(&catalog, store.as_ref(), &board).await;
    }
}

async fn forward_inserts(
    mut inserts: broadcast::Receiver<VoteInserted>,
    trigger: mpsc::Sender<()>,
) {
    loop {
        match inserts.recv().await {
            Ok(event) if event.is_resync() => {
                info!("Vote store resynced, refreshing rankings");
                request(&trigger);
            }
            Ok(event) => {
                debug!(character_key = ?event.character_key, "Vote inserted, refreshing rankings");
                request(&trigger);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "Insert notifications lagged, refreshing rankings");
                request(&trigger);
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("Vote insert notifications closed");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use character_votes_repository::{InMemoryVoteStore, VoteStoreError};
    use character_votes_shared::types::{Character, CharacterKey, UserId, Vote, VoteType};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    use crate::ranking::RankingSnapshot;

    fn catalog() -> Arc<Catalog> {
        Arc::new(Catalog::new(vec![
            Character::new("Walter", "White", "https://img.test/1.png"),
            Character::new("Jesse", "Pinkman", "https://img.test/2.png"),
        ]))
    }

    fn vote(user: &str, key: &str, vote_type: VoteType) -> Vote {
        Vote::new(CharacterKey::from(key), vote_type, UserId::from(user))
    }

    async fn wait_for(
        board: &RankingBoard,
        predicate: impl Fn(&RankingSnapshot) -> bool,
    ) -> RankingSnapshot {
        let mut receiver = board.subscribe();
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                {
                    let snapshot = receiver.borrow_and_update();
                    if predicate(&snapshot) {
                        return snapshot.clone();
                    }
                }
                receiver.changed().await.unwrap();
            }
        })
        .await
        .expect("ranking board did not reach the expected state")
    }

    /// Accepts subscriptions but fails every read.
    struct UnreadableVoteStore {
        inner: InMemoryVoteStore,
    }

    #[async_trait::async_trait]
    impl VoteStore for UnreadableVoteStore {
        async fn get_user_votes(&self, _: &UserId) -> Result<Vec<Vote>, VoteStoreError> {
            Err(VoteStoreError::Unavailable("read failed".into()))
        }

        async fn get_all_votes(&self) -> Result<Vec<Vote>, VoteStoreError> {
            Err(VoteStoreError::Unavailable("read failed".into()))
        }

        async fn insert_vote(&self, vote: &Vote) -> Result<(), VoteStoreError> {
            self.inner.insert_vote(vote).await
        }

        async fn subscribe_inserts(
            &self,
        ) -> Result<broadcast::Receiver<VoteInserted>, VoteStoreError> {
            self.inner.subscribe_inserts().await
        }

        async fn check_schema(&self) -> Result<bool, VoteStoreError> {
            Ok(true)
        }
    }

    /// Counts full fetches and holds each one until the gate opens.
    struct GatedVoteStore {
        inner: InMemoryVoteStore,
        fetches: AtomicUsize,
        started: Notify,
        gate: Notify,
    }

    impl GatedVoteStore {
        fn new() -> Self {
            Self {
                inner: InMemoryVoteStore::new(),
                fetches: AtomicUsize::new(0),
                started: Notify::new(),
                gate: Notify::new(),
            }
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl VoteStore for GatedVoteStore {
        async fn get_user_votes(&self, user_id: &UserId) -> Result<Vec<Vote>, VoteStoreError> {
            self.inner.get_user_votes(user_id).await
        }

        async fn get_all_votes(&self) -> Result<Vec<Vote>, VoteStoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();
            self.gate.notified().await;
            self.inner.get_all_votes().await
        }

        async fn insert_vote(&self, vote: &Vote) -> Result<(), VoteStoreError> {
            self.inner.insert_vote(vote).await
        }

        async fn subscribe_inserts(
            &self,
        ) -> Result<broadcast::Receiver<VoteInserted>, VoteStoreError> {
            self.inner.subscribe_inserts().await
        }

        async fn check_schema(&self) -> Result<bool, VoteStoreError> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_initial_refresh_loads_rankings() {
        let store = Arc::new(InMemoryVoteStore::with_votes(vec![
            vote("u1", "Walter-White", VoteType::Like),
            vote("u2", "Walter-White", VoteType::Like),
        ]));
        let board = Arc::new(RankingBoard::new());

        let _refresher = RankingRefresher::spawn(catalog(), store, Arc::clone(&board))
            .await
            .unwrap();

        let snapshot = wait_for(&board, |s| !s.loading).await;
        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.rankings.beloved.len(), 1);
        assert_eq!(snapshot.rankings.beloved[0].score, 2);
        assert_eq!(snapshot.rankings.neutral.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_notification_triggers_refresh() {
        let store = Arc::new(InMemoryVoteStore::new());
        let board = Arc::new(RankingBoard::new());
        let _refresher = RankingRefresher::spawn(catalog(), store.clone(), Arc::clone(&board))
            .await
            .unwrap();
        wait_for(&board, |s| !s.loading).await;

        store
            .insert_vote(&vote("u1", "Jesse-Pinkman", VoteType::Dislike))
            .await
            .unwrap();

        let snapshot = wait_for(&board, |s| !s.rankings.hated.is_empty()).await;
        assert_eq!(snapshot.rankings.hated[0].character.first_name, "Jesse");
        assert_eq!(snapshot.rankings.hated[0].score, -1);
    }

    #[tokio::test]
    async fn test_refresh_now_applies_latest_votes() {
        let store = Arc::new(InMemoryVoteStore::new());
        let board = Arc::new(RankingBoard::new());
        let refresher = RankingRefresher::spawn(catalog(), store.clone(), Arc::clone(&board))
            .await
            .unwrap();

        assert!(refresher.refresh_now().await);
        let snapshot = refresher.board().snapshot();
        assert!(!snapshot.loading);
        assert_eq!(snapshot.rankings.neutral.len(), 2);
    }

    #[tokio::test]
    async fn test_read_failure_surfaces_error() {
        let store = Arc::new(UnreadableVoteStore {
            inner: InMemoryVoteStore::new(),
        });
        let board = Arc::new(RankingBoard::new());
        let _refresher = RankingRefresher::spawn(catalog(), store, Arc::clone(&board))
            .await
            .unwrap();

        let snapshot = wait_for(&board, |s| !s.loading).await;
        assert_eq!(snapshot.error.as_deref(), Some(crate::ranking::STATS_ERROR_MESSAGE));
        assert!(snapshot.rankings.neutral.is_empty());
    }

    #[tokio::test]
    async fn test_burst_of_requests_coalesces_into_one_refetch() {
        let store = Arc::new(GatedVoteStore::new());
        let board = Arc::new(RankingBoard::new());
        let refresher = RankingRefresher::spawn(catalog(), store.clone(), Arc::clone(&board))
            .await
            .unwrap();

        // The initial refresh is now held inside the store.
        tokio::time::timeout(Duration::from_secs(5), store.started.notified())
            .await
            .unwrap();

        for _ in 0..20 {
            refresher.request_refresh();
        }

        // Release the held fetch and the single queued one.
        store.gate.notify_one();
        tokio::time::timeout(Duration::from_secs(5), store.started.notified())
            .await
            .unwrap();
        store.gate.notify_one();

        let snapshot = wait_for(&board, |s| s.sequence >= 2).await;
        assert!(!snapshot.loading);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.fetches(), 2);
    }

    #[tokio::test]
    async fn test_resync_event_triggers_refresh() {
        let store = Arc::new(InMemoryVoteStore::new());
        let board = Arc::new(RankingBoard::new());
        let (sender, inserts) = broadcast::channel(4);
        let (trigger, mut requests) = mpsc::channel(1);
        let forwarder = tokio::spawn(forward_inserts(inserts, trigger));

        sender.send(VoteInserted::resync()).unwrap();

        tokio::time::timeout(Duration::from_secs(5), requests.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(refresh_once(&catalog(), store.as_ref(), &board).await);
        forwarder.abort();
    }
}
