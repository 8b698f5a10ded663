// Draft persistence
//
// The autosave controller only sees a `Fn(ReviewSnapshot) -> SaveFuture`.
// DraftStore is that seam; FileDraftStore writes one YAML file per document.

use crate::models::{ReviewDraft, ReviewSnapshot};
use crate::services::SaveFuture;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};

/// Where review drafts go
#[cfg_attr(test, mockall::automock)]
pub trait DraftStore: Send + Sync {
    /// Persist every draft in the snapshot
    fn persist(&self, snapshot: ReviewSnapshot) -> SaveFuture;
}

/// Stores each draft as `<dir>/<readable id>-<id hash>.yaml`
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    dir: Utf8PathBuf,
}

impl FileDraftStore {
    pub fn new<P: AsRef<Utf8Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Path of the draft file for a document
    pub fn draft_path(&self, document_id: &str) -> Utf8PathBuf {
        self.dir.join(format!("{}.yaml", draft_file_stem(document_id)))
    }

    /// Read every draft in the store directory.
    ///
    /// A missing directory yields an empty snapshot. Unreadable files are
    /// skipped with a warning so one bad draft does not lose the rest.
    pub async fn load(&self) -> Result<ReviewSnapshot> {
        let mut snapshot = ReviewSnapshot::default();

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(snapshot),
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to read draft directory {}", self.dir));
            }
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("Failed to list draft directory {}", self.dir))?
        {
            let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
                continue;
            };
            if path.extension() == Some("yaml") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            match read_draft(&path).await {
                Ok(draft) => {
                    snapshot.drafts.insert(draft.document_id.clone(), draft);
                }
                Err(err) => tracing::warn!("Skipping unreadable draft {}: {:#}", path, err),
            }
        }

        tracing::info!("Loaded {} draft(s) from {}", snapshot.drafts.len(), self.dir);
        Ok(snapshot)
    }

    /// Write every draft, replacing each file atomically
    pub async fn save(&self, snapshot: &ReviewSnapshot) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create draft directory {}", self.dir))?;

        for draft in snapshot.drafts.values() {
            let path = self.draft_path(&draft.document_id);
            let yaml = serde_yaml_ng::to_string(draft)
                .with_context(|| format!("Failed to serialize draft {}", draft.document_id))?;

            let tmp = path.with_extension("yaml.tmp");
            tokio::fs::write(&tmp, yaml)
                .await
                .with_context(|| format!("Failed to write draft file {}", tmp))?;
            tokio::fs::rename(&tmp, &path)
                .await
                .with_context(|| format!("Failed to replace draft file {}", path))?;
        }

        tracing::debug!("Wrote {} draft(s) to {}", snapshot.drafts.len(), self.dir);
        Ok(())
    }
}

impl DraftStore for FileDraftStore {
    fn persist(&self, snapshot: ReviewSnapshot) -> SaveFuture {
        let store = self.clone();
        Box::pin(async move { store.save(&snapshot).await })
    }
}

async fn read_draft(path: &Utf8Path) -> Result<ReviewDraft> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read draft file {}", path))?;
    serde_yaml_ng::from_str(&contents).with_context(|| format!("Failed to parse draft file {}", path))
}

/// Length of the id hash suffix, in hex digits
const ID_HASH_LEN: usize = 12;

/// File stem for a draft.
///
/// The readable part keeps ids from escaping the store directory but is
/// lossy (`inv.1` and `inv_1` both read `inv_1`), so the hash of the raw id
/// keeps distinct documents in distinct files.
fn draft_file_stem(id: &str) -> String {
    let readable: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let hash = blake3::hash(id.as_bytes());
    format!("{}-{}", readable, &hash.to_hex()[..ID_HASH_LEN])
}
