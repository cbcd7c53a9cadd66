//! Repository layer over the content tables. All ownership stamping and
//! fetch-then-authorize-then-delete sequencing lives here; handlers never
//! touch SQL directly.

use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use crate::auth::policy;
use crate::db::models::{Accusation, Comment, Photo, Settings};
use crate::db::now_timestamp;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

/// Which repository tier a caller is entitled to. Privileged ignores
/// row-level ownership and is selected only after the per-request PIN
/// check has already passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessTier {
    Restricted,
    Privileged,
}

/// How a listing was actually served. Callers can tell "no rows" apart
/// from "could not access privileged rows".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListMode {
    Privileged,
    Restricted,
    Unavailable,
}

#[derive(Debug, Serialize)]
pub struct ListOutcome<T> {
    pub mode: ListMode,
    pub rows: Vec<T>,
}

/// Internal query plan after tier resolution.
enum ListPlan {
    All(ListMode),
    Owned(ListMode),
    Nothing(ListMode),
}

#[derive(Clone)]
pub struct ContentRepo {
    pool: DbPool,
    /// Whether this deployment has privileged-tier credentials at all.
    allow_bypass: bool,
}

impl ContentRepo {
    pub fn new(pool: DbPool, allow_bypass: bool) -> Self {
        Self { pool, allow_bypass }
    }

    /// Resolve the tier a caller asked for against what the deployment
    /// offers. Degrading is logged so operators can tell why an admin
    /// listing came back narrow or empty.
    fn resolve_tier(&self, requested: AccessTier, owner_id: &str) -> ListPlan {
        match requested {
            AccessTier::Privileged if self.allow_bypass => ListPlan::All(ListMode::Privileged),
            AccessTier::Privileged => {
                tracing::warn!(
                    "Privileged repository tier unavailable; falling back to restricted listing"
                );
                if owner_id.is_empty() {
                    // No identity to even filter by: nothing can be served.
                    ListPlan::Nothing(ListMode::Unavailable)
                } else {
                    ListPlan::Owned(ListMode::Restricted)
                }
            }
            AccessTier::Restricted => ListPlan::Owned(ListMode::Restricted),
        }
    }

    // ----- accusations -----

    pub fn list_accusations(
        &self,
        tier: AccessTier,
        owner_id: &str,
    ) -> AppResult<ListOutcome<Accusation>> {
        let conn = self.pool.get()?;

        let (mode, rows) = match self.resolve_tier(tier, owner_id) {
            ListPlan::All(mode) => {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, accused_name, reason, created_at, updated_at \
                     FROM accusations ORDER BY created_at DESC, id DESC",
                )?;
                let rows = stmt.query_map([], accusation_from_row)?;
                (mode, rows.collect::<Result<Vec<_>, _>>()?)
            }
            ListPlan::Owned(mode) => {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, accused_name, reason, created_at, updated_at \
                     FROM accusations WHERE user_id = ?1 \
                     ORDER BY created_at DESC, id DESC",
                )?;
                let rows = stmt.query_map(params![owner_id], accusation_from_row)?;
                (mode, rows.collect::<Result<Vec<_>, _>>()?)
            }
            ListPlan::Nothing(mode) => (mode, Vec::new()),
        };

        Ok(ListOutcome { mode, rows })
    }

    pub fn create_accusation(
        &self,
        owner_id: &str,
        accused_name: &str,
        reason: &str,
    ) -> AppResult<Accusation> {
        let accused_name = accused_name.trim();
        let reason = reason.trim();
        if accused_name.is_empty() || reason.is_empty() {
            return Err(AppError::Validation("Missing required fields".into()));
        }

        let conn = self.pool.get()?;
        let id = uuid::Uuid::now_v7().to_string();
        let now = now_timestamp();
        conn.execute(
            "INSERT INTO accusations (id, user_id, accused_name, reason, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![id, owner_id, accused_name, reason, now],
        )?;

        Ok(Accusation {
            id,
            user_id: owner_id.to_string(),
            accused_name: accused_name.to_string(),
            reason: reason.to_string(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Fetch the current owner, authorize, then delete. Racing deletes
    /// observe NotFound, which callers treat as benign.
    pub fn delete_accusation(&self, id: &str, requester: &str, is_admin: bool) -> AppResult<()> {
        let conn = self.pool.get()?;
        let owner: Option<String> = conn
            .query_row(
                "SELECT user_id FROM accusations WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let owner = owner.ok_or(AppError::NotFound)?;

        if !policy::can_delete(&owner, requester, is_admin) {
            return Err(AppError::Forbidden);
        }

        let deleted = conn.execute("DELETE FROM accusations WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    // ----- photos -----

    pub fn list_photos(&self, tier: AccessTier, owner_id: &str) -> AppResult<ListOutcome<Photo>> {
        let conn = self.pool.get()?;

        let (mode, rows) = match self.resolve_tier(tier, owner_id) {
            ListPlan::All(mode) => {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, accusation_id, photo_url, created_at \
                     FROM photos ORDER BY created_at DESC, id DESC",
                )?;
                let rows = stmt.query_map([], photo_from_row)?;
                (mode, rows.collect::<Result<Vec<_>, _>>()?)
            }
            ListPlan::Owned(mode) => {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, accusation_id, photo_url, created_at \
                     FROM photos WHERE user_id = ?1 \
                     ORDER BY created_at DESC, id DESC",
                )?;
                let rows = stmt.query_map(params![owner_id], photo_from_row)?;
                (mode, rows.collect::<Result<Vec<_>, _>>()?)
            }
            ListPlan::Nothing(mode) => (mode, Vec::new()),
        };

        Ok(ListOutcome { mode, rows })
    }

    pub fn create_photo(
        &self,
        owner_id: &str,
        photo_url: &str,
        accusation_id: Option<&str>,
    ) -> AppResult<Photo> {
        if photo_url.trim().is_empty() {
            return Err(AppError::Validation("Missing photo URL".into()));
        }

        let conn = self.pool.get()?;
        let id = uuid::Uuid::now_v7().to_string();
        let now = now_timestamp();
        conn.execute(
            "INSERT INTO photos (id, user_id, accusation_id, photo_url, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, owner_id, accusation_id, photo_url, now],
        )?;

        Ok(Photo {
            id,
            user_id: owner_id.to_string(),
            accusation_id: accusation_id.map(str::to_string),
            photo_url: photo_url.to_string(),
            created_at: now,
        })
    }

    /// Fetch owner and URL, authorize, then delete the row. Returns the
    /// stored URL so the caller can attempt storage cleanup.
    pub fn delete_photo(&self, id: &str, requester: &str, is_admin: bool) -> AppResult<String> {
        let conn = self.pool.get()?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT user_id, photo_url FROM photos WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (owner, photo_url) = row.ok_or(AppError::NotFound)?;

        if !policy::can_delete(&owner, requester, is_admin) {
            return Err(AppError::Forbidden);
        }

        let deleted = conn.execute("DELETE FROM photos WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(AppError::NotFound);
        }
        Ok(photo_url)
    }

    // ----- comments -----

    /// Comments are shared discussion under a photo: filtered by photo id
    /// only, no ownership filter, no identity required to read.
    pub fn list_comments(&self, photo_id: &str) -> AppResult<Vec<Comment>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, photo_id, user_id, comment, created_at \
             FROM photo_comments WHERE photo_id = ?1 \
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![photo_id], comment_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn create_comment(
        &self,
        owner_id: &str,
        photo_id: &str,
        comment: &str,
    ) -> AppResult<Comment> {
        let comment = comment.trim();
        if photo_id.is_empty() || comment.is_empty() {
            return Err(AppError::Validation("Missing required fields".into()));
        }

        let conn = self.pool.get()?;
        let id = uuid::Uuid::now_v7().to_string();
        let now = now_timestamp();
        conn.execute(
            "INSERT INTO photo_comments (id, photo_id, user_id, comment, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, photo_id, owner_id, comment, now],
        )?;

        Ok(Comment {
            id,
            photo_id: photo_id.to_string(),
            user_id: owner_id.to_string(),
            comment: comment.to_string(),
            created_at: now,
        })
    }

    pub fn delete_comment(&self, id: &str, requester: &str) -> AppResult<()> {
        let conn = self.pool.get()?;
        let owner: Option<String> = conn
            .query_row(
                "SELECT user_id FROM photo_comments WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let owner = owner.ok_or(AppError::NotFound)?;

        if !policy::can_delete_comment(&owner, requester) {
            return Err(AppError::Forbidden);
        }

        let deleted = conn.execute("DELETE FROM photo_comments WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    // ----- settings -----

    /// Never errors outward: a missing row, a missing table, or any backend
    /// fault yields the default. The toggle this gates must not be able to
    /// block anything else.
    pub fn get_settings(&self) -> Settings {
        let fallback = || Settings {
            id: String::new(),
            notifications_enabled: true,
            updated_at: String::new(),
        };

        let conn = match self.pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!("Settings read failed, returning defaults: {}", e);
                return fallback();
            }
        };

        let row = conn
            .query_row(
                "SELECT id, notifications_enabled, updated_at FROM settings LIMIT 1",
                [],
                settings_from_row,
            )
            .optional();

        match row {
            Ok(Some(settings)) => settings,
            Ok(None) => fallback(),
            Err(e) => {
                tracing::error!("Settings read failed, returning defaults: {}", e);
                fallback()
            }
        }
    }

    /// Create-or-update the singleton row.
    pub fn put_settings(&self, notifications_enabled: bool) -> AppResult<Settings> {
        let conn = self.pool.get()?;
        let now = now_timestamp();

        let existing: Option<String> = conn
            .query_row("SELECT id FROM settings LIMIT 1", [], |row| row.get(0))
            .optional()?;

        let id = match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE settings SET notifications_enabled = ?1, updated_at = ?2 WHERE id = ?3",
                    params![notifications_enabled, now, id],
                )?;
                id
            }
            None => {
                let id = uuid::Uuid::now_v7().to_string();
                conn.execute(
                    "INSERT INTO settings (id, notifications_enabled, updated_at) \
                     VALUES (?1, ?2, ?3)",
                    params![id, notifications_enabled, now],
                )?;
                id
            }
        };

        Ok(Settings {
            id,
            notifications_enabled,
            updated_at: now,
        })
    }
}

fn accusation_from_row(row: &Row<'_>) -> rusqlite::Result<Accusation> {
    Ok(Accusation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        accused_name: row.get(2)?,
        reason: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn photo_from_row(row: &Row<'_>) -> rusqlite::Result<Photo> {
    Ok(Photo {
        id: row.get(0)?,
        user_id: row.get(1)?,
        accusation_id: row.get(2)?,
        photo_url: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        photo_id: row.get(1)?,
        user_id: row.get(2)?,
        comment: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn settings_from_row(row: &Row<'_>) -> rusqlite::Result<Settings> {
    Ok(Settings {
        id: row.get(0)?,
        notifications_enabled: row.get(1)?,
        updated_at: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn test_repo(allow_bypass: bool) -> (tempfile::TempDir, ContentRepo) {
        let tmp = tempfile::tempdir().unwrap();
        let pool = db::create_pool(&tmp.path().join("test.db")).unwrap();
        db::run_migrations(&pool).unwrap();
        (tmp, ContentRepo::new(pool, allow_bypass))
    }

    #[test]
    fn restricted_listing_only_returns_own_rows() {
        let (_tmp, repo) = test_repo(true);
        repo.create_accusation("alice", "Carlos", "llegó tarde").unwrap();
        repo.create_accusation("bob", "Dana", "se durmió").unwrap();

        let outcome = repo
            .list_accusations(AccessTier::Restricted, "alice")
            .unwrap();
        assert_eq!(outcome.mode, ListMode::Restricted);
        assert_eq!(outcome.rows.len(), 1);
        assert!(outcome.rows.iter().all(|a| a.user_id == "alice"));
    }

    #[test]
    fn privileged_listing_returns_all_rows() {
        let (_tmp, repo) = test_repo(true);
        repo.create_accusation("alice", "Carlos", "llegó tarde").unwrap();
        repo.create_accusation("bob", "Dana", "se durmió").unwrap();

        let outcome = repo.list_accusations(AccessTier::Privileged, "").unwrap();
        assert_eq!(outcome.mode, ListMode::Privileged);
        assert_eq!(outcome.rows.len(), 2);
    }

    #[test]
    fn privileged_listing_degrades_when_bypass_unavailable() {
        let (_tmp, repo) = test_repo(false);
        repo.create_accusation("alice", "Carlos", "llegó tarde").unwrap();

        // With an identity, degrade to the owner filter.
        let outcome = repo.list_accusations(AccessTier::Privileged, "alice").unwrap();
        assert_eq!(outcome.mode, ListMode::Restricted);
        assert_eq!(outcome.rows.len(), 1);

        // Without one, nothing can be served and the outcome says so.
        let outcome = repo.list_accusations(AccessTier::Privileged, "").unwrap();
        assert_eq!(outcome.mode, ListMode::Unavailable);
        assert!(outcome.rows.is_empty());
    }

    #[test]
    fn accusations_listed_newest_first() {
        let (_tmp, repo) = test_repo(true);
        let first = repo.create_accusation("alice", "Uno", "primero").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = repo.create_accusation("alice", "Dos", "segundo").unwrap();

        let rows = repo
            .list_accusations(AccessTier::Restricted, "alice")
            .unwrap()
            .rows;
        assert_eq!(rows[0].id, second.id);
        assert_eq!(rows[1].id, first.id);
    }

    #[test]
    fn blank_accusation_fields_rejected() {
        let (_tmp, repo) = test_repo(true);
        assert!(matches!(
            repo.create_accusation("alice", "  ", "reason"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            repo.create_accusation("alice", "name", ""),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn owner_delete_succeeds_once_then_not_found() {
        let (_tmp, repo) = test_repo(true);
        let row = repo.create_accusation("alice", "Carlos", "motivo").unwrap();

        repo.delete_accusation(&row.id, "alice", false).unwrap();
        assert!(matches!(
            repo.delete_accusation(&row.id, "alice", false),
            Err(AppError::NotFound)
        ));
    }

    #[test]
    fn stranger_delete_forbidden_and_row_intact() {
        let (_tmp, repo) = test_repo(true);
        let row = repo.create_accusation("alice", "Carlos", "motivo").unwrap();

        assert!(matches!(
            repo.delete_accusation(&row.id, "bob", false),
            Err(AppError::Forbidden)
        ));
        let rows = repo
            .list_accusations(AccessTier::Restricted, "alice")
            .unwrap()
            .rows;
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn admin_delete_bypasses_ownership() {
        let (_tmp, repo) = test_repo(true);
        let row = repo.create_accusation("alice", "Carlos", "motivo").unwrap();
        repo.delete_accusation(&row.id, "someone-else", true).unwrap();
    }

    #[test]
    fn photo_delete_returns_url_for_cleanup() {
        let (_tmp, repo) = test_repo(true);
        let photo = repo
            .create_photo("alice", "http://host/objects/photos/alice/x.jpg", None)
            .unwrap();
        let url = repo.delete_photo(&photo.id, "alice", false).unwrap();
        assert_eq!(url, "http://host/objects/photos/alice/x.jpg");
    }

    #[test]
    fn photo_requires_url() {
        let (_tmp, repo) = test_repo(true);
        assert!(matches!(
            repo.create_photo("alice", "  ", None),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn comment_text_is_trimmed_and_blank_rejected() {
        let (_tmp, repo) = test_repo(true);
        let photo = repo.create_photo("alice", "http://x/p.jpg", None).unwrap();

        assert!(matches!(
            repo.create_comment("bob", &photo.id, "   \n "),
            Err(AppError::Validation(_))
        ));

        let before = now_timestamp();
        let comment = repo
            .create_comment("bob", &photo.id, "  qué foto  ")
            .unwrap();
        assert_eq!(comment.comment, "qué foto");
        assert_eq!(comment.photo_id, photo.id);
        assert!(comment.created_at >= before);
        assert_eq!(repo.list_comments(&photo.id).unwrap().len(), 1);
    }

    #[test]
    fn comments_readable_without_ownership_filter() {
        let (_tmp, repo) = test_repo(true);
        let photo = repo.create_photo("alice", "http://x/p.jpg", None).unwrap();
        repo.create_comment("bob", &photo.id, "uno").unwrap();
        repo.create_comment("carol", &photo.id, "dos").unwrap();

        let comments = repo.list_comments(&photo.id).unwrap();
        assert_eq!(comments.len(), 2);
    }

    #[test]
    fn comment_delete_owner_only_even_for_admin_flows() {
        let (_tmp, repo) = test_repo(true);
        let photo = repo.create_photo("alice", "http://x/p.jpg", None).unwrap();
        let comment = repo.create_comment("bob", &photo.id, "hola").unwrap();

        assert!(matches!(
            repo.delete_comment(&comment.id, "alice"),
            Err(AppError::Forbidden)
        ));
        repo.delete_comment(&comment.id, "bob").unwrap();
    }

    #[test]
    fn settings_default_when_absent() {
        let (_tmp, repo) = test_repo(true);
        let settings = repo.get_settings();
        assert!(settings.notifications_enabled);
    }

    #[test]
    fn settings_put_creates_then_updates_single_row() {
        let (_tmp, repo) = test_repo(true);
        let created = repo.put_settings(false).unwrap();
        assert!(!created.notifications_enabled);
        assert!(!repo.get_settings().notifications_enabled);

        let updated = repo.put_settings(true).unwrap();
        assert_eq!(updated.id, created.id);
        assert!(repo.get_settings().notifications_enabled);
    }
}
