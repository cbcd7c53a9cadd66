use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tokio::sync::Mutex;

use crate::auth::AdminSessionStore;
use crate::config::Config;
use crate::repo::ContentRepo;
use crate::storage::ObjectStore;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub repo: ContentRepo,
    pub store: Arc<dyn ObjectStore>,
    pub admin_sessions: Arc<Mutex<AdminSessionStore>>,
}
