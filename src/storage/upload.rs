//! Batch upload pipeline. Files are processed strictly sequentially so
//! progress reporting stays monotonic and a failure is attributable to a
//! single file. One bad file never aborts the rest of the batch.

use bytes::Bytes;
use rand::Rng;

use crate::db::models::Photo;
use crate::repo::ContentRepo;
use crate::storage::ObjectStore;

/// Per-file size cap: 100 MiB.
pub const MAX_FILE_BYTES: usize = 100 * 1024 * 1024;

const PHOTOS_BUCKET: &str = "photos";

#[derive(Debug)]
pub struct UploadedFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Debug, serde::Serialize)]
pub struct UploadFailure {
    pub file_name: String,
    pub reason: String,
}

#[derive(Debug, serde::Serialize)]
pub struct BatchOutcome {
    pub total: usize,
    pub completed: usize,
    pub photos: Vec<Photo>,
    pub failures: Vec<UploadFailure>,
}

impl BatchOutcome {
    pub fn any_succeeded(&self) -> bool {
        self.completed > 0
    }
}

/// Run a batch through validate -> store -> persist, one file at a time.
/// `on_progress(resolved, total)` fires after each file settles, success
/// or failure. Metadata is only written after the binary is stored, so a
/// failed upload never leaves a ghost row; the reverse orphan (stored
/// bytes with no row) is possible and accepted.
pub async fn process_batch(
    repo: &ContentRepo,
    store: &dyn ObjectStore,
    owner_id: &str,
    accusation_id: Option<&str>,
    files: Vec<UploadedFile>,
    mut on_progress: impl FnMut(usize, usize),
) -> BatchOutcome {
    let total = files.len();
    let mut outcome = BatchOutcome {
        total,
        completed: 0,
        photos: Vec::new(),
        failures: Vec::new(),
    };

    for (index, file) in files.into_iter().enumerate() {
        match process_file(repo, store, owner_id, accusation_id, &file).await {
            Ok(photo) => {
                outcome.completed += 1;
                outcome.photos.push(photo);
            }
            Err(reason) => {
                tracing::warn!("Upload of \"{}\" failed: {}", file.name, reason);
                outcome.failures.push(UploadFailure {
                    file_name: file.name,
                    reason,
                });
            }
        }
        on_progress(index + 1, total);
    }

    outcome
}

async fn process_file(
    repo: &ContentRepo,
    store: &dyn ObjectStore,
    owner_id: &str,
    accusation_id: Option<&str>,
    file: &UploadedFile,
) -> Result<Photo, String> {
    if !file.content_type.starts_with("image/") {
        return Err(format!("\"{}\" is not an image", file.name));
    }
    if file.data.len() > MAX_FILE_BYTES {
        return Err(format!("\"{}\" is too large (max 100MB)", file.name));
    }

    let key = storage_key(owner_id, &file.name);
    store
        .put(PHOTOS_BUCKET, &key, file.data.clone())
        .await
        .map_err(|e| format!("Storage error: {}", e))?;

    let url = store.public_url(PHOTOS_BUCKET, &key);
    repo.create_photo(owner_id, &url, accusation_id)
        .map_err(|e| format!("Database error: {}", e))
}

/// `{owner}/{unix_millis}_{rand9}.{ext}` — scoped under the owner so keys
/// can't collide across users and per-owner cleanup is a prefix listing.
fn storage_key(owner_id: &str, file_name: &str) -> String {
    let ext = file_name
        .rsplit('.')
        .next()
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_lowercase)
        .unwrap_or_else(|| "bin".to_string());

    let millis = chrono::Utc::now().timestamp_millis();
    format!("{}/{}_{}.{}", owner_id, millis, random_suffix(), ext)
}

fn random_suffix() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..9)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}
