//! PostgreSQL implementation of the vote store.
//!
//! Votes live in a single `votes` table with a unique constraint on
//! `(character_id, user_id)`. An `AFTER INSERT` trigger publishes every new row
//! on the `votes_inserted` notification channel, which this store forwards to
//! in-process subscribers.
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use character_votes_shared::types::{CharacterKey, UserId, Vote, VoteType};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::{VoteInserted, VoteStore, VoteStoreError};

/// Name of the Postgres notification channel fed by the insert trigger.
pub const VOTES_INSERTED_CHANNEL: &str = "votes_inserted";

const NOTIFICATION_BUFFER: usize = 64;
const LISTENER_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Columns of `votes` that the queries below read or write.
pub const REQUIRED_COLUMNS: [&str; 4] = ["character_id", "vote_type", "user_id", "created_at"];

#[derive(sqlx::FromRow)]
struct VoteRow {
    character_id: String,
    vote_type: String,
    user_id: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<VoteRow> for Vote {
    type Error = VoteStoreError;

    fn try_from(row: VoteRow) -> Result<Self, Self::Error> {
        let vote_type = row
            .vote_type
            .parse::<VoteType>()
            .map_err(VoteStoreError::InvalidVoteType)?;

        Ok(Vote {
            character_key: CharacterKey::new(row.character_id),
            vote_type,
            user_id: UserId::new(row.user_id),
            created_at: Some(row.created_at),
        })
    }
}

/// PostgreSQL-backed vote store.
///
/// Reads and writes go through a shared `sqlx::PgPool`. The notification
/// listener is started on the first call to `subscribe_inserts` and shared by
/// every subscriber afterwards.
pub struct PostgresVoteStore {
    pool: sqlx::PgPool,
    notifications: broadcast::Sender<VoteInserted>,
    listening: AtomicBool,
}

impl PostgresVoteStore {
    /// Creates a new PostgreSQL vote store.
    ///
    /// # Arguments
    ///
    /// * `pool` - Configured PostgreSQL connection pool
    pub fn new(pool: sqlx::PgPool) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_BUFFER);
        Self {
            pool,
            notifications,
            listening: AtomicBool::new(false),
        }
    }

    /// Connects to the database at `url` and creates a store on top of the pool.
    pub async fn connect(url: &str) -> Result<Self, VoteStoreError> {
        let pool = sqlx::PgPool::connect(url).await?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded migrations (table, unique constraint, insert trigger).
    pub async fn migrate(&self) -> Result<(), VoteStoreError> {
        sqlx::migrate!("./src/postgres/migrations")
            .run(&self.pool)
            .await?;
        Ok(())
    }

    async fn start_listener(&self) -> Result<(), VoteStoreError> {
        let listener = connect_listener(&self.pool).await?;
        info!(channel = VOTES_INSERTED_CHANNEL, "Listening for vote inserts");

        tokio::spawn(run_listener(
            listener,
            self.pool.clone(),
            self.notifications.clone(),
        ));

        Ok(())
    }
}

async fn connect_listener(pool: &sqlx::PgPool) -> Result<PgListener, sqlx::Error> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(VOTES_INSERTED_CHANNEL).await?;
    Ok(listener)
}

/// Reconnects until the channel is listened to again.
async fn reconnect_listener(pool: &sqlx::PgPool) -> PgListener {
    loop {
        match connect_listener(pool).await {
            Ok(listener) => {
                info!(channel = VOTES_INSERTED_CHANNEL, "Vote insert listener reconnected");
                return listener;
            }
            Err(e) => {
                error!(error = %e, "Vote insert listener reconnect failed, retrying");
                tokio::time::sleep(LISTENER_RETRY_DELAY).await;
            }
        }
    }
}

/// Forwards notifications to in-process subscribers.
///
/// Notifications sent while the connection is down are lost, so every
/// reconnect is followed by a resync event that makes consumers refetch.
async fn run_listener(
    mut listener: PgListener,
    pool: sqlx::PgPool,
    sender: broadcast::Sender<VoteInserted>,
) {
    loop {
        match listener.try_recv().await {
            Ok(Some(notification)) => {
                debug!(payload = notification.payload(), "Vote insert notification");
                // No receivers is fine; nobody is watching the rankings yet.
                let _ = sender.send(VoteInserted::new(CharacterKey::new(
                    notification.payload(),
                )));
                continue;
            }
            Ok(None) => warn!("Vote insert listener lost its connection"),
            Err(e) => {
                error!(error = %e, "Vote insert listener failed");
                tokio::time::sleep(LISTENER_RETRY_DELAY).await;
            }
        }

        listener = reconnect_listener(&pool).await;
        let _ = sender.send(VoteInserted::resync());
    }
}

#[async_trait]
impl VoteStore for PostgresVoteStore {
    async fn get_user_votes(&self, user_id: &UserId) -> Result<Vec<Vote>, VoteStoreError> {
        let rows = sqlx::query_as::<_, VoteRow>(
            r#"
            SELECT character_id, vote_type, user_id, created_at
            FROM votes
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Vote::try_from).collect()
    }

    async fn get_all_votes(&self) -> Result<Vec<Vote>, VoteStoreError> {
        let rows = sqlx::query_as::<_, VoteRow>(
            r#"
            SELECT character_id, vote_type, user_id, created_at
            FROM votes
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Vote::try_from).collect()
    }

    /// Inserts a vote. The unique constraint on `(character_id, user_id)`
    /// surfaces as `VoteStoreError::DuplicateVote`.
    async fn insert_vote(&self, vote: &Vote) -> Result<(), VoteStoreError> {
        sqlx::query(
            r#"
            INSERT INTO votes (character_id, vote_type, user_id)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(vote.character_key.as_str())
        .bind(vote.vote_type.as_str())
        .bind(vote.user_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn subscribe_inserts(
        &self,
    ) -> Result<broadcast::Receiver<VoteInserted>, VoteStoreError> {
        let receiver = self.notifications.subscribe();

        if self
            .listening
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            if let Err(e) = self.start_listener().await {
                self.listening.store(false, Ordering::Release);
                return Err(e);
            }
        }

        Ok(receiver)
    }

    async fn check_schema(&self) -> Result<bool, VoteStoreError> {
        let columns: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT column_name::text
            FROM information_schema.columns
            WHERE table_schema = current_schema()
              AND table_name = 'votes'
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(REQUIRED_COLUMNS
            .iter()
            .all(|required| columns.iter().any(|c| c == required)))
    }
}
