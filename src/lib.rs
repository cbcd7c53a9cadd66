// Library exports for Picota
// This allows integration tests and external code to use Picota modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod repo;
pub mod routes;
pub mod state;
pub mod storage;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::auth::AdminSessionStore;
use crate::config::Config;
use crate::repo::ContentRepo;
use crate::state::{AppState, DbPool};
use crate::storage::FsObjectStore;

/// Wire up application state from a migrated pool and loaded config.
pub fn build_state(pool: DbPool, config: Config) -> AppState {
    let repo = ContentRepo::new(pool.clone(), config.admin.allow_bypass);
    let store = Arc::new(FsObjectStore::new(
        config.uploads_path().clone(),
        config.public_url().to_string(),
    ));
    AppState {
        db: pool,
        config,
        repo,
        store,
        admin_sessions: Arc::new(Mutex::new(AdminSessionStore::new())),
    }
}
