use super::error::{DeletionError, ScanError};
use super::invoker::Engine;
use crate::controller::ScanController;
use crate::models::{CliOutput, FileInfo};
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;

/// Host capability that moves a path to the system trash.
#[cfg_attr(test, mockall::automock)]
pub trait Trash: Send + Sync {
    fn move_to_trash(&self, path: &Utf8Path) -> Result<(), DeletionError>;
}

/// The platform trash / recycle bin.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTrash;

impl Trash for SystemTrash {
    fn move_to_trash(&self, path: &Utf8Path) -> Result<(), DeletionError> {
        trash::delete(path.as_std_path()).map_err(|e| DeletionError::Trash {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

/// What happened after a file was trashed.
#[derive(Debug, Clone)]
pub struct DeletionOutcome {
    pub trashed: Utf8PathBuf,
    /// Result of the follow-up rescan. `None` if nothing had been scanned yet.
    pub rescan: Option<Result<Arc<CliOutput>, ScanError>>,
}

/// Trashes one file at a time, then rescans the last-scanned directory.
///
/// The in-memory report is never edited directly: a successful trash is
/// followed by a full rescan with the previous options. A failed trash
/// leaves the session alone and does not rescan.
pub struct DeletionCoordinator<E: Engine, T: Trash> {
    controller: Arc<ScanController<E>>,
    trash: Arc<T>,
}

impl<E: Engine> DeletionCoordinator<E, SystemTrash> {
    pub fn with_system_trash(controller: Arc<ScanController<E>>) -> Self {
        Self::new(controller, SystemTrash)
    }
}

impl<E: Engine, T: Trash + 'static> DeletionCoordinator<E, T> {
    pub fn new(controller: Arc<ScanController<E>>, trash: T) -> Self {
        Self {
            controller,
            trash: Arc::new(trash),
        }
    }

    pub fn controller(&self) -> &Arc<ScanController<E>> {
        &self.controller
    }

    /// Move `file` to the trash and rescan on success.
    pub async fn delete_file(&self, file: &FileInfo) -> Result<DeletionOutcome, DeletionError> {
        let path = Utf8PathBuf::from(&file.path);
        tracing::info!("Moving {} to trash", path);

        // Trash backends block on the filesystem / platform APIs.
        let trash = Arc::clone(&self.trash);
        let target = path.clone();
        let trashed = match tokio::task::spawn_blocking(move || trash.move_to_trash(&target)).await {
            Ok(result) => result,
            Err(e) => Err(DeletionError::Interrupted(e.to_string())),
        };

        let metrics = self.controller.metrics();
        if let Err(err) = trashed {
            tracing::warn!("Could not trash {}: {}", path, err);
            metrics.record_deletion_failure();
            return Err(err);
        }
        metrics.record_file_trashed();

        let rescan = self.controller.rescan().await;

        Ok(DeletionOutcome {
            trashed: path,
            rescan,
        })
    }
}
