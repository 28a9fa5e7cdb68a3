//! Dependency initialization and wiring for the Character Votes service.

use std::sync::Arc;

use character_votes_flow::{IdentityProvider, RankingBoard, RankingRefresher, SessionRegistry};
use character_votes_repository::{InMemoryVoteStore, PostgresVoteStore, VoteStore};
use character_votes_shared::types::Catalog;
use tracing::{info, warn};

use crate::auth::JwtIdentityProvider;
use crate::config::Settings;
use crate::errors::AppError;
use crate::server::state::AppState;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// Shared state handed to the HTTP router.
    pub state: AppState,
}

impl Dependencies {
    /// Builds every dependency described by `settings`.
    ///
    /// With `DATABASE_URL` set, votes live in Postgres and ranking refreshes are
    /// pushed through `LISTEN/NOTIFY`. Without it, votes are kept in memory and
    /// lost on restart.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(AppError)` - If the catalog cannot be loaded or the store cannot be reached
    pub async fn new(settings: &Settings) -> Result<Self, AppError> {
        info!(
            catalog_path = %settings.catalog_path.display(),
            server_addr = %settings.server_addr,
            persistent = settings.database_url.is_some(),
            run_migrations = settings.run_migrations,
            "Initializing dependencies"
        );

        let catalog = Arc::new(Catalog::load(&settings.catalog_path)?);
        if catalog.is_empty() {
            warn!("Character catalog is empty, every session will start complete");
        }
        info!(characters = catalog.len(), "Loaded character catalog");

        let store = Self::create_store(settings).await?;

        let identity: Arc<dyn IdentityProvider> =
            Arc::new(JwtIdentityProvider::new(&settings.auth));
        let sessions = Arc::new(SessionRegistry::new(Arc::clone(&catalog), Arc::clone(&store)));
        let board = Arc::new(RankingBoard::new());
        let refresher = Arc::new(
            RankingRefresher::spawn(catalog, store, Arc::clone(&board)).await?,
        );

        Ok(Self {
            state: AppState {
                identity,
                sessions,
                board,
                refresher,
                cors_origins: Arc::new(settings.cors_origins.clone()),
            },
        })
    }

    async fn create_store(settings: &Settings) -> Result<Arc<dyn VoteStore>, AppError> {
        let Some(database_url) = &settings.database_url else {
            warn!("DATABASE_URL not set, votes will be kept in memory");
            return Ok(Arc::new(InMemoryVoteStore::new()));
        };

        let store = PostgresVoteStore::connect(database_url).await?;
        if settings.run_migrations {
            store.migrate().await?;
            info!("Database migrations applied");
        }
        if !store.check_schema().await? {
            warn!("votes table does not have the expected columns, writes will raise the schema alert");
        }

        Ok(Arc::new(store))
    }
}
