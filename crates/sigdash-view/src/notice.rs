//! User-facing notices.
//!
//! Every view model reports outcomes (saved, adjusted, failed) as a
//! [`Notice`] on a shared broadcast channel. Frontends subscribe and render
//! them as toasts; the board also keeps the latest one for polling callers.

use parking_lot::Mutex;
use serde::Serialize;
use sigdash_client::ClientError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace, warn};

/// How long a toast stays on screen.
pub const NOTICE_DISPLAY: Duration = Duration::from_secs(3);

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    /// Describe a failed client call. Locally refused actions are warnings,
    /// everything else is an error.
    pub fn from_client_error(context: &str, err: &ClientError) -> Self {
        match err {
            ClientError::Validation(msg) => Self::warning(format!("{context}: {msg}")),
            ClientError::Server { message, .. } => Self::error(format!("{context}: {message}")),
            other => Self::error(format!("{context}: {other}")),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

/// Broadcast channel of notices shared by all view models.
#[derive(Clone)]
pub struct NoticeBoard {
    tx: broadcast::Sender<Notice>,
    last: Arc<Mutex<Option<Notice>>>,
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl NoticeBoard {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            last: Arc::new(Mutex::new(None)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    /// Publish a notice to every subscriber.
    pub fn publish(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success | NoticeLevel::Info => info!(notice = %notice.message, "Notice"),
            NoticeLevel::Warning => warn!(notice = %notice.message, "Notice"),
            NoticeLevel::Error => error!(notice = %notice.message, "Notice"),
        }

        *self.last.lock() = Some(notice.clone());
        match self.tx.send(notice) {
            Ok(n) => trace!(receivers = n, "Notice delivered"),
            Err(_) => debug!("No notice subscribers"),
        }
    }

    /// Most recent notice, if any.
    pub fn last(&self) -> Option<Notice> {
        self.last.lock().clone()
    }
}
