//! Strategy file manager.

use parking_lot::RwLock;
use sigdash_client::{
    ClientError, DashboardApi, StrategyDownload, StrategyFile, StrategyInfoUpdate,
    StrategyStatus, StrategyUpload, MAX_STRATEGY_UPLOAD_BYTES,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use crate::error::{ViewError, ViewResult};
use crate::notice::{Notice, NoticeBoard};

/// Lists and edits the strategy files known to the backend.
pub struct StrategyManager {
    api: DashboardApi,
    notices: NoticeBoard,
    strategies: RwLock<Vec<StrategyFile>>,
    busy: AtomicBool,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl StrategyManager {
    pub fn new(api: DashboardApi, notices: NoticeBoard) -> Self {
        Self {
            api,
            notices,
            strategies: RwLock::new(Vec::new()),
            busy: AtomicBool::new(false),
        }
    }

    pub fn strategies(&self) -> Vec<StrategyFile> {
        self.strategies.read().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Labels for strategy dropdowns.
    pub fn labels(&self) -> Vec<(i64, String)> {
        self.strategies
            .read()
            .iter()
            .map(|s| (s.id, s.display_label()))
            .collect()
    }

    fn begin(&self) -> ViewResult<BusyGuard<'_>> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(ViewError::Busy("strategy operation in progress"));
        }
        Ok(BusyGuard(&self.busy))
    }

    fn fail(&self, context: &str, e: ClientError) -> ViewError {
        self.notices.publish(Notice::from_client_error(context, &e));
        ViewError::Client(e)
    }

    /// Reload the strategy list.
    pub async fn refresh(&self) -> ViewResult<usize> {
        let _busy = self.begin()?;
        self.fetch_list().await
    }

    async fn fetch_list(&self) -> ViewResult<usize> {
        let list = self
            .api
            .list_strategies()
            .await
            .map_err(|e| self.fail("Failed to load strategies", e))?;
        let count = list.len();
        *self.strategies.write() = list;
        debug!(count, "Strategy list loaded");
        Ok(count)
    }

    /// Validate and upload a strategy file, then reload the list.
    pub async fn upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        description: Option<String>,
    ) -> ViewResult<StrategyFile> {
        let upload = StrategyUpload::new(filename, bytes, description).map_err(|e| {
            self.notices
                .publish(Notice::from_client_error("Upload refused", &e));
            ViewError::Client(e)
        })?;

        let _busy = self.begin()?;
        let file = self
            .api
            .upload_strategy(upload)
            .await
            .map_err(|e| self.fail("Upload failed", e))?;
        self.notices
            .publish(Notice::success(format!("Uploaded {}", file.display_label())));
        self.fetch_list().await?;
        Ok(file)
    }

    /// Upload a file from disk. The size limit is checked before reading.
    pub async fn upload_path(
        &self,
        path: &Path,
        description: Option<String>,
    ) -> ViewResult<StrategyFile> {
        let len = tokio::fs::metadata(path).await?.len();
        if len > MAX_STRATEGY_UPLOAD_BYTES as u64 {
            let e = ClientError::Validation(format!(
                "{} is {len} bytes, limit is {MAX_STRATEGY_UPLOAD_BYTES}",
                path.display()
            ));
            self.notices
                .publish(Notice::from_client_error("Upload refused", &e));
            return Err(ViewError::Client(e));
        }

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        self.upload(&filename, bytes, description).await
    }

    pub async fn download(&self, id: i64) -> ViewResult<StrategyDownload> {
        self.api
            .download_strategy(id)
            .await
            .map_err(|e| self.fail("Download failed", e))
    }

    /// Hot-reload a strategy on the backend.
    pub async fn reload(&self, id: i64) -> ViewResult<()> {
        let _busy = self.begin()?;
        let message = self
            .api
            .reload_strategy(id)
            .await
            .map_err(|e| self.fail("Reload failed", e))?;
        self.notices.publish(Notice::success(
            message.text().unwrap_or("Strategy reloaded").to_string(),
        ));
        self.fetch_list().await.map(|_| ())
    }

    pub async fn set_status(&self, id: i64, status: StrategyStatus) -> ViewResult<StrategyFile> {
        let _busy = self.begin()?;
        let updated = self
            .api
            .set_strategy_status(id, status)
            .await
            .map_err(|e| self.fail("Status update failed", e))?;
        info!(id, status = %status, "Strategy status changed");
        self.replace(updated.clone());
        Ok(updated)
    }

    pub async fn update_info(
        &self,
        id: i64,
        display_name: Option<String>,
        description: Option<String>,
    ) -> ViewResult<StrategyFile> {
        let update = StrategyInfoUpdate {
            description,
            display_name,
        };
        let _busy = self.begin()?;
        let updated = self
            .api
            .update_strategy_info(id, &update)
            .await
            .map_err(|e| self.fail("Update failed", e))?;
        self.replace(updated.clone());
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> ViewResult<()> {
        let _busy = self.begin()?;
        self.api
            .delete_strategy(id)
            .await
            .map_err(|e| self.fail("Delete failed", e))?;
        self.strategies.write().retain(|s| s.id != id);
        self.notices.publish(Notice::success("Strategy deleted"));
        Ok(())
    }

    /// Import the backend's builtin strategies and reload the list.
    pub async fn import_builtin(&self) -> ViewResult<usize> {
        let _busy = self.begin()?;
        let imported = self
            .api
            .import_builtin_strategies()
            .await
            .map_err(|e| self.fail("Import failed", e))?;
        self.notices.publish(Notice::success(format!(
            "Imported {} builtin strategies",
            imported.count
        )));
        self.fetch_list().await?;
        Ok(imported.count)
    }

    fn replace(&self, updated: StrategyFile) {
        let mut strategies = self.strategies.write();
        match strategies.iter_mut().find(|s| s.id == updated.id) {
            Some(slot) => *slot = updated,
            None => strategies.push(updated),
        }
    }
}
