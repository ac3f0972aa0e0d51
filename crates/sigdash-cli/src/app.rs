//! Application orchestration.
//!
//! Builds the backend client and view models from [`AppConfig`] and runs
//! one CLI command against them:
//! - settings editing with the fetch-frequency floor
//! - signal listing, latest strip and dashboard panels
//! - strategy files, backtests and the theme mode
//! - `watch`: an interactive list driven by stdin, a refresh timer and the
//!   theme clock

use crate::cli::{BacktestAction, SettingsAction, SignalArgs, StrategyAction, ThemeAction};
use crate::commands::{WatchCommand, WATCH_HELP};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::render;
use sigdash_client::{DashboardApi, StrategyStatus};
use sigdash_core::{
    minimum_fetch_frequency, CollectionSettings, CryptoMode, ProxyEndpoint, ProxyKind, Signal,
};
use sigdash_view::{
    BacktestRunner, Clock, DashboardView, DynSignalSource, Notice, NoticeBoard, PreferenceStore,
    SettingsEditor, SignalQueryCoordinator, StrategyManager, SystemClock, ThemeController,
    ThemeMode,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Minimum fetch frequency for a hypothetical configuration, without a
/// backend.
pub fn min_frequency(all: bool, coins: usize, proxies: usize) -> u32 {
    let settings = CollectionSettings {
        crypto_mode: if all { CryptoMode::All } else { CryptoMode::Custom },
        crypto_symbols: (0..coins).map(|i| format!("COIN{i}")).collect(),
        proxies: (0..proxies)
            .map(|i| ProxyEndpoint::new(ProxyKind::Socks5, format!("proxy-{i}"), 1080))
            .collect(),
        ..CollectionSettings::default()
    };
    minimum_fetch_frequency(&settings)
}

fn parse_mode(raw: &str) -> AppResult<CryptoMode> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "custom" => Ok(CryptoMode::Custom),
        "all" => Ok(CryptoMode::All),
        other => Err(AppError::InvalidArgument(format!(
            "unknown mode {other:?}, expected custom or all"
        ))),
    }
}

/// Main application.
pub struct Application {
    config: AppConfig,
    api: DashboardApi,
    notices: NoticeBoard,
    clock: Arc<dyn Clock>,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let api = DashboardApi::with_timeout(&config.api.base_url, config.timeout())?
            .with_listing(config.api.listing);
        Ok(Self {
            config,
            api,
            notices: NoticeBoard::new(),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    fn source(&self) -> DynSignalSource {
        Arc::new(self.api.clone())
    }

    fn coordinator(&self) -> SignalQueryCoordinator {
        SignalQueryCoordinator::new(
            self.source(),
            self.config.coordinator(),
            self.notices.clone(),
        )
    }

    fn theme_controller(&self) -> AppResult<ThemeController> {
        let store = PreferenceStore::open(&self.config.theme.preferences_path)?;
        Ok(ThemeController::new(store, self.clock.clone()))
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    /// Load the settings, apply `action` and save unless it was `show`.
    pub async fn settings(&self, action: SettingsAction) -> AppResult<String> {
        let editor = SettingsEditor::new(self.notices.clone());
        editor.load(&self.api).await?;

        match action {
            SettingsAction::Show => {
                return Ok(render::settings(
                    &editor.settings(),
                    &editor.available_exchanges(),
                ))
            }
            SettingsAction::SetFrequency { minutes } => {
                editor.set_frequency_input(&minutes);
            }
            SettingsAction::SetMode { mode } => editor.set_mode(parse_mode(&mode)?),
            SettingsAction::AddCoin { symbol } => {
                if !editor.add_coin(&symbol) {
                    return Err(AppError::InvalidArgument(format!(
                        "{symbol:?} is blank or already tracked"
                    )));
                }
            }
            SettingsAction::RemoveCoin { symbol } => {
                if !editor.remove_coin(&symbol) {
                    return Err(AppError::InvalidArgument(format!("{symbol} is not tracked")));
                }
            }
            SettingsAction::AddExchange { exchange } => {
                if !editor.add_exchange(&exchange)? {
                    return Err(AppError::InvalidArgument(format!(
                        "{exchange:?} is blank or already selected"
                    )));
                }
            }
            SettingsAction::RemoveExchange { exchange } => {
                if !editor.remove_exchange(&exchange)? {
                    return Err(AppError::InvalidArgument(format!(
                        "{exchange} is not selected"
                    )));
                }
            }
            SettingsAction::AddProxy { uri } => {
                let proxy = ProxyEndpoint::parse_uri(&uri)
                    .map_err(|e| AppError::InvalidArgument(e.to_string()))?;
                editor.add_proxy(proxy);
            }
            SettingsAction::RemoveProxy { index } => {
                editor.remove_proxy(index).ok_or_else(|| {
                    AppError::InvalidArgument(format!("no proxy at index {index}"))
                })?;
            }
        }

        editor.save(&self.api).await?;
        Ok(render::settings(
            &editor.settings(),
            &editor.available_exchanges(),
        ))
    }

    // ------------------------------------------------------------------
    // Signals
    // ------------------------------------------------------------------

    async fn apply_args(
        &self,
        coordinator: &SignalQueryCoordinator,
        args: &SignalArgs,
    ) -> AppResult<()> {
        coordinator.edit_filter(|criteria| {
            for (name, value) in args.field_edits() {
                criteria.set_field(name, value);
            }
        });
        coordinator.apply_filter().await?;

        if args.page > 1 {
            match coordinator.change_page(args.page).await {
                Some(result) => {
                    result?;
                }
                None => {
                    return Err(AppError::InvalidArgument(format!(
                        "page {} is out of range (1..={})",
                        args.page,
                        coordinator.state().page.last_page()
                    )))
                }
            }
        }

        if let Some(id) = &args.detail {
            if !coordinator.select_detail(id) {
                return Err(AppError::InvalidArgument(format!(
                    "signal {id} is not on page {}",
                    coordinator.current_page()
                )));
            }
        }
        Ok(())
    }

    pub async fn signals(&self, args: SignalArgs) -> AppResult<String> {
        let coordinator = self.coordinator();
        self.apply_args(&coordinator, &args).await?;
        Ok(render::signal_view(
            &coordinator.state(),
            coordinator.visible_pages(),
        ))
    }

    pub async fn latest(&self, limit: Option<u32>) -> AppResult<String> {
        let mut config = self.config.coordinator();
        if let Some(limit) = limit {
            config.latest_limit = limit;
        }
        let coordinator =
            SignalQueryCoordinator::new(self.source(), config, self.notices.clone());
        let latest = latest_with_fallback(&coordinator).await?;
        Ok(render::signal_table(&latest))
    }

    /// Stats, chart and latest signals. The first page of signals backs the
    /// local fallbacks.
    pub async fn dashboard(&self) -> AppResult<String> {
        let coordinator = self.coordinator();
        if let Err(e) = coordinator.apply_filter().await {
            debug!(error = %e, "Signal list unavailable for dashboard fallbacks");
        }
        let loaded = coordinator.state().page.into_items();

        let view = DashboardView::new(
            self.source(),
            self.clock.clone(),
            self.notices.clone(),
            self.config.query.latest_limit,
        );
        view.load_all(&loaded).await;
        let snapshot = view.snapshot();

        let mut out = String::new();
        out.push_str(&render::stats(&snapshot.stats, snapshot.stats_fallback));
        out.push('\n');
        out.push_str(&render::chart(&snapshot.chart));
        out.push('\n');
        out.push_str(&render::signal_table(&snapshot.latest));
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Strategies and backtests
    // ------------------------------------------------------------------

    pub async fn strategies(&self, action: StrategyAction) -> AppResult<String> {
        let manager = StrategyManager::new(self.api.clone(), self.notices.clone());

        match action {
            StrategyAction::List => {
                manager.refresh().await?;
            }
            StrategyAction::Upload { path, description } => {
                let file = manager.upload_path(&path, description).await?;
                info!(id = file.id, filename = %file.filename, "Strategy uploaded");
            }
            StrategyAction::Download { id, output } => {
                let download = manager.download(id).await?;
                let dir = output.unwrap_or_else(|| PathBuf::from("."));
                let target = dir.join(&download.filename);
                tokio::fs::write(&target, &download.bytes).await?;
                return Ok(format!(
                    "saved {} ({} bytes)\n",
                    target.display(),
                    download.bytes.len()
                ));
            }
            StrategyAction::Reload { id } => {
                manager.reload(id).await?;
                manager.refresh().await?;
            }
            StrategyAction::Status { id, status } => {
                let status = StrategyStatus::parse(&status).ok_or_else(|| {
                    AppError::InvalidArgument(format!("unknown strategy status {status:?}"))
                })?;
                manager.set_status(id, status).await?;
                manager.refresh().await?;
            }
            StrategyAction::Rename {
                id,
                name,
                description,
            } => {
                if name.is_none() && description.is_none() {
                    return Err(AppError::InvalidArgument(
                        "give --name and/or --description".to_string(),
                    ));
                }
                manager.update_info(id, name, description).await?;
                manager.refresh().await?;
            }
            StrategyAction::Delete { id } => {
                manager.delete(id).await?;
                manager.refresh().await?;
            }
            StrategyAction::ImportBuiltin => {
                manager.import_builtin().await?;
            }
        }

        Ok(render::strategy_table(&manager.strategies()))
    }

    pub async fn backtest(&self, action: BacktestAction) -> AppResult<String> {
        let runner = BacktestRunner::new(self.api.clone(), self.notices.clone(), self.clock.today());

        match action {
            BacktestAction::Run {
                strategy,
                symbol,
                from,
                to,
                balance,
                timeframe,
            } => {
                runner.edit_form(|form| {
                    form.strategy_name = strategy;
                    if let Some(symbol) = symbol {
                        form.symbol = symbol;
                    }
                    if let Some(from) = from {
                        form.start_date = from;
                    }
                    if let Some(to) = to {
                        form.end_date = to;
                    }
                    if let Some(balance) = balance {
                        form.initial_balance = balance;
                    }
                    if let Some(timeframe) = timeframe {
                        form.timeframe = timeframe;
                    }
                });
                let result = runner.run().await?;
                Ok(render::backtest(&result))
            }
            BacktestAction::Download { symbols, from, to } => {
                runner.edit_form(|form| {
                    if let Some(from) = from {
                        form.start_date = from;
                    }
                    if let Some(to) = to {
                        form.end_date = to;
                    }
                });
                let reply = runner.download_data(symbols).await?;
                Ok(format!("{}\n", serde_json::to_string_pretty(&reply)?))
            }
            BacktestAction::Info => {
                let info = runner.data_info().await?;
                Ok(format!("{}\n", serde_json::to_string_pretty(&info)?))
            }
        }
    }

    // ------------------------------------------------------------------
    // Theme
    // ------------------------------------------------------------------

    pub fn theme(&self, action: ThemeAction) -> AppResult<String> {
        let controller = self.theme_controller()?;
        match action {
            ThemeAction::Show => {}
            ThemeAction::Cycle => {
                controller.cycle()?;
            }
            ThemeAction::Set { mode } => {
                let parsed = ThemeMode::parse(&mode);
                if parsed.as_str() != mode.trim().to_ascii_lowercase() {
                    return Err(AppError::InvalidArgument(format!(
                        "unknown theme mode {mode:?}, expected auto, dark or light"
                    )));
                }
                controller.set_mode(parsed)?;
            }
        }
        Ok(format!(
            "mode {} (showing {:?})\n",
            controller.mode(),
            controller.theme()
        ))
    }

    // ------------------------------------------------------------------
    // Watch
    // ------------------------------------------------------------------

    /// Interactive signal list until `quit`, end of input or ctrl-c.
    pub async fn watch(&self, args: SignalArgs) -> AppResult<()> {
        let coordinator = self.coordinator();
        let dashboard = DashboardView::new(
            self.source(),
            self.clock.clone(),
            self.notices.clone(),
            self.config.query.latest_limit,
        );
        let theme = Arc::new(self.theme_controller()?);

        let cancel = CancellationToken::new();
        let theme_task = tokio::spawn(sigdash_view::run_theme_clock(
            theme.clone(),
            Duration::from_secs(self.config.theme.tick_secs),
            cancel.clone(),
        ));

        let mut settled = coordinator.subscribe_settled();
        let mut theme_rx = theme.subscribe();
        let mut notices_rx = self.notices.subscribe();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut refresh = tokio::time::interval(Duration::from_secs(self.config.watch.refresh_secs));
        refresh.tick().await;

        if let Err(e) = self.apply_args(&coordinator, &args).await {
            warn!(error = %e, "Initial signal query failed");
        }
        dashboard
            .load_latest(coordinator.state().page.items())
            .await;
        println!("{}", render::signal_view(&coordinator.state(), coordinator.visible_pages()));
        println!("theme: {:?} ({} mode). Type `help` for commands.", theme.theme(), theme.mode());

        info!(
            refresh_secs = self.config.watch.refresh_secs,
            theme_tick_secs = self.config.theme.tick_secs,
            "Entering watch loop"
        );

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let line = match line {
                        Ok(Some(line)) => line,
                        Ok(None) => {
                            info!("Input closed");
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "Failed to read input");
                            break;
                        }
                    };
                    match WatchCommand::parse(&line) {
                        None => {}
                        Some(Err(e)) => eprintln!("{e}"),
                        Some(Ok(WatchCommand::Quit)) => break,
                        Some(Ok(command)) => {
                            self.handle_watch_command(&coordinator, &theme, command).await;
                        }
                    }
                }

                Ok(()) = settled.changed() => {
                    println!("{}", render::signal_view(&coordinator.state(), coordinator.visible_pages()));
                }

                Ok(()) = theme_rx.changed() => {
                    let current = *theme_rx.borrow_and_update();
                    println!("theme: {current:?}");
                }

                notice = notices_rx.recv() => match notice {
                    Ok(notice) => print_notice(&notice),
                    Err(RecvError::Lagged(skipped)) => debug!(skipped, "Notice printer lagged"),
                    Err(RecvError::Closed) => {}
                },

                _ = refresh.tick() => {
                    debug!("Periodic refresh");
                    // Failures surface as notices.
                    let _ = coordinator.refresh().await;
                    dashboard.refresh(coordinator.state().page.items()).await;
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        cancel.cancel();
        if let Err(e) = theme_task.await {
            warn!(error = %e, "Theme clock task failed");
        }
        info!("Watch stopped");
        Ok(())
    }

    async fn handle_watch_command(
        &self,
        coordinator: &SignalQueryCoordinator,
        theme: &ThemeController,
        command: WatchCommand,
    ) {
        // Query results are rendered when the query settles.
        match command {
            WatchCommand::SetField { name, value } => {
                if !coordinator.set_field(&name, &value) {
                    eprintln!("unknown filter field: {name}");
                }
            }
            WatchCommand::Page(page) => {
                if coordinator.change_page(page).await.is_none() {
                    eprintln!("page {page} is not available");
                }
            }
            WatchCommand::Next => {
                if coordinator.next_page().await.is_none() {
                    eprintln!("already on the last page");
                }
            }
            WatchCommand::Previous => {
                if coordinator.previous_page().await.is_none() {
                    eprintln!("already on the first page");
                }
            }
            WatchCommand::Apply => {
                let _ = coordinator.apply_filter().await;
            }
            WatchCommand::Reset => {
                let _ = coordinator.reset_filter().await;
            }
            WatchCommand::Refresh => {
                let _ = coordinator.refresh().await;
            }
            WatchCommand::Detail(id) => {
                if coordinator.select_detail(&id) {
                    println!("{}", render::signal_view(&coordinator.state(), coordinator.visible_pages()));
                } else {
                    eprintln!("signal {id} is not on this page");
                }
            }
            WatchCommand::CloseDetail => coordinator.close_detail(),
            WatchCommand::Theme => match theme.cycle() {
                Ok(mode) => println!("theme mode: {mode}"),
                Err(e) => eprintln!("failed to change theme: {e}"),
            },
            WatchCommand::Help => println!("{WATCH_HELP}"),
            WatchCommand::Quit => {}
        }
    }
}

/// Load page 1, then the latest strip, so a failed latest query falls back
/// to the first loaded signals.
async fn latest_with_fallback(coordinator: &SignalQueryCoordinator) -> AppResult<Vec<Signal>> {
    if let Err(e) = coordinator.apply_filter().await {
        debug!(error = %e, "Signal list unavailable for latest fallback");
    }
    Ok(coordinator.load_latest().await?)
}

/// Print a notice to stderr.
pub fn print_notice(notice: &Notice) {
    eprintln!("[{}] {}", notice.level, notice.message);
}
