//! Collection settings editor.
//!
//! Edits happen on a local copy; nothing reaches the backend until
//! [`SettingsEditor::save`]. The fetch-frequency floor is recomputed after
//! every change to the coin universe or proxy pool and enforced on save.

use parking_lot::RwLock;
use sigdash_client::{ClientResult, DashboardApi, SelectOptions};
use sigdash_core::{
    clamp_fetch_frequency, minimum_fetch_frequency, parse_frequency_input, CollectionSettings,
    CryptoMode, ProxyEndpoint, StoredSettings,
};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use crate::error::{ViewError, ViewResult};
use crate::notice::{Notice, NoticeBoard};
use crate::source::BoxFuture;

/// Backend persistence of collection settings.
pub trait SettingsStore: Send + Sync {
    fn load_settings(&self) -> BoxFuture<'_, ClientResult<StoredSettings>>;

    fn save_settings<'a>(
        &'a self,
        settings: &'a CollectionSettings,
    ) -> BoxFuture<'a, ClientResult<()>>;

    fn select_options(&self) -> BoxFuture<'_, ClientResult<SelectOptions>>;
}

impl SettingsStore for DashboardApi {
    fn load_settings(&self) -> BoxFuture<'_, ClientResult<StoredSettings>> {
        Box::pin(DashboardApi::load_settings(self))
    }

    fn save_settings<'a>(
        &'a self,
        settings: &'a CollectionSettings,
    ) -> BoxFuture<'a, ClientResult<()>> {
        Box::pin(DashboardApi::save_settings(self, settings))
    }

    fn select_options(&self) -> BoxFuture<'_, ClientResult<SelectOptions>> {
        Box::pin(DashboardApi::select_options(self))
    }
}

struct EditorState {
    settings: CollectionSettings,
    /// Last loaded or saved settings, for dirty tracking.
    snapshot: CollectionSettings,
    options: SelectOptions,
}

/// Local editor of [`CollectionSettings`].
pub struct SettingsEditor {
    state: RwLock<EditorState>,
    saving: AtomicBool,
    notices: NoticeBoard,
}

struct SavingGuard<'a>(&'a AtomicBool);

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SettingsEditor {
    pub fn new(notices: NoticeBoard) -> Self {
        Self::from_parts(StoredSettings::default(), SelectOptions::default(), notices)
    }

    /// Editor over already-fetched settings and options.
    pub fn from_parts(stored: StoredSettings, options: SelectOptions, notices: NoticeBoard) -> Self {
        let settings = CollectionSettings::from_stored(stored, &options.default_crypto_coin_symbols);
        Self {
            state: RwLock::new(EditorState {
                snapshot: settings.clone(),
                settings,
                options,
            }),
            saving: AtomicBool::new(false),
            notices,
        }
    }

    /// Fetch options and settings from the backend and start over.
    ///
    /// Options are fetched first since missing symbols are seeded from the
    /// default coin list. A failed options call falls back to empty options.
    pub async fn load(&self, store: &dyn SettingsStore) -> ViewResult<()> {
        let options = match store.select_options().await {
            Ok(options) => options,
            Err(e) => {
                debug!(error = %e, "Select options unavailable");
                SelectOptions::default()
            }
        };

        let stored = store.load_settings().await.map_err(|e| {
            self.notices
                .publish(Notice::from_client_error("Failed to load settings", &e));
            ViewError::Client(e)
        })?;

        let settings = CollectionSettings::from_stored(stored, &options.default_crypto_coin_symbols);
        info!(
            mode = %settings.crypto_mode,
            coins = settings.crypto_symbols.len(),
            exchanges = settings.exchange_types.len(),
            fetch_frequency = settings.fetch_frequency_minutes,
            "Loaded collection settings"
        );

        let mut state = self.state.write();
        state.snapshot = settings.clone();
        state.settings = settings;
        state.options = options;
        Ok(())
    }

    pub fn settings(&self) -> CollectionSettings {
        self.state.read().settings.clone()
    }

    pub fn options(&self) -> SelectOptions {
        self.state.read().options.clone()
    }

    /// Current fetch-frequency floor.
    pub fn minimum_frequency(&self) -> u32 {
        minimum_fetch_frequency(&self.state.read().settings)
    }

    /// Whether local edits differ from the last loaded/saved settings.
    pub fn is_dirty(&self) -> bool {
        let state = self.state.read();
        state.settings != state.snapshot
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::SeqCst)
    }

    /// Discard local edits.
    pub fn revert(&self) {
        let mut state = self.state.write();
        state.settings = state.snapshot.clone();
    }

    // ------------------------------------------------------------------
    // Coin universe
    // ------------------------------------------------------------------

    pub fn set_mode(&self, mode: CryptoMode) {
        self.state.write().settings.crypto_mode = mode;
    }

    /// Add a coin symbol (trimmed, uppercased). Returns `false` for blank or
    /// already present symbols.
    pub fn add_coin(&self, raw: &str) -> bool {
        let symbol = raw.trim().to_ascii_uppercase();
        if symbol.is_empty() {
            return false;
        }

        let mut state = self.state.write();
        if state.settings.crypto_symbols.contains(&symbol) {
            return false;
        }
        state.settings.crypto_symbols.push(symbol);
        debug!(
            coins = state.settings.crypto_symbols.len(),
            minimum = minimum_fetch_frequency(&state.settings),
            "Coin added"
        );
        true
    }

    pub fn remove_coin(&self, symbol: &str) -> bool {
        let mut state = self.state.write();
        let before = state.settings.crypto_symbols.len();
        state.settings.crypto_symbols.retain(|s| s != symbol);
        state.settings.crypto_symbols.len() != before
    }

    // ------------------------------------------------------------------
    // Exchanges
    // ------------------------------------------------------------------

    /// Offered exchanges not yet selected.
    pub fn available_exchanges(&self) -> Vec<String> {
        let state = self.state.read();
        state
            .options
            .exchange_types
            .iter()
            .filter(|e| !state.settings.exchange_types.contains(e))
            .cloned()
            .collect()
    }

    /// Select an exchange. Already selected exchanges are ignored; when the
    /// backend offers a list, the exchange must be on it.
    pub fn add_exchange(&self, exchange: &str) -> ViewResult<bool> {
        let exchange = exchange.trim();
        let mut state = self.state.write();
        if exchange.is_empty() || state.settings.exchange_types.iter().any(|e| e == exchange) {
            return Ok(false);
        }
        if !state.options.exchange_types.is_empty()
            && !state.options.exchange_types.iter().any(|e| e == exchange)
        {
            return Err(ViewError::Validation(format!(
                "exchange {exchange} is not offered by the backend"
            )));
        }
        state.settings.exchange_types.push(exchange.to_string());
        Ok(true)
    }

    /// Deselect an exchange. The last remaining exchange cannot be removed.
    pub fn remove_exchange(&self, exchange: &str) -> ViewResult<bool> {
        let mut state = self.state.write();
        if !state.settings.exchange_types.iter().any(|e| e == exchange) {
            return Ok(false);
        }
        if state.settings.exchange_types.len() <= 1 {
            drop(state);
            self.notices
                .publish(Notice::warning("At least one exchange must stay selected"));
            return Err(ViewError::Validation(
                "cannot remove the last exchange".to_string(),
            ));
        }
        state.settings.exchange_types.retain(|e| e != exchange);
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Proxies and frequency
    // ------------------------------------------------------------------

    pub fn add_proxy(&self, proxy: ProxyEndpoint) {
        self.state.write().settings.proxies.push(proxy);
    }

    pub fn remove_proxy(&self, index: usize) -> Option<ProxyEndpoint> {
        let mut state = self.state.write();
        (index < state.settings.proxies.len()).then(|| state.settings.proxies.remove(index))
    }

    /// Apply raw frequency input. Non-numeric, non-positive or too-low input
    /// is raised to the minimum with an informational notice.
    pub fn set_frequency_input(&self, raw: &str) -> u32 {
        let adjusted = {
            let mut state = self.state.write();
            let (settings, adjusted) = parse_frequency_input(raw, state.settings.clone());
            state.settings = settings;
            adjusted
        };

        if let Some(adjusted) = adjusted {
            self.notices.publish(Notice::info(adjusted.to_string()));
        }
        self.state.read().settings.fetch_frequency_minutes
    }

    // ------------------------------------------------------------------
    // Save
    // ------------------------------------------------------------------

    /// Clamp the frequency to the floor (with a notice) and return the
    /// settings that would be persisted.
    pub fn prepare_save(&self) -> CollectionSettings {
        let (settings, adjusted) = {
            let mut state = self.state.write();
            let (settings, adjusted) = clamp_fetch_frequency(state.settings.clone());
            state.settings = settings.clone();
            (settings, adjusted)
        };

        if let Some(adjusted) = adjusted {
            self.notices.publish(Notice::info(adjusted.to_string()));
        }
        settings
    }

    /// Persist the settings.
    pub async fn save(&self, store: &dyn SettingsStore) -> ViewResult<()> {
        if self.saving.swap(true, Ordering::SeqCst) {
            return Err(ViewError::Busy("settings save already in progress"));
        }
        let _saving = SavingGuard(&self.saving);

        let settings = self.prepare_save();
        match store.save_settings(&settings).await {
            Ok(()) => {
                self.state.write().snapshot = settings;
                self.notices.publish(Notice::success("Settings saved"));
                Ok(())
            }
            Err(e) => {
                self.notices
                    .publish(Notice::from_client_error("Failed to save settings", &e));
                Err(ViewError::Client(e))
            }
        }
    }
}
