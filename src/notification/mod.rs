//! User-facing failure notices (toast equivalents) and their delivery backends

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use tracing::{debug, error, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Presentation collaborator for notices.
pub trait Notifier {
    fn notify(&self, notice: &Notice);
}

/// Notification backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationBackend {
    /// Drop notices
    None,
    /// Write notices to the tracing log only
    #[default]
    Log,
    /// Desktop notifications (via notify-rust)
    System,
    /// Log and desktop
    Both,
}

impl NotificationBackend {
    pub fn from_settings_value(s: &str) -> Option<Self> {
        Self::from_str(s).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Log => "log",
            Self::System => "system",
            Self::Both => "both",
        }
    }
}

impl FromStr for NotificationBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "log" => Ok(Self::Log),
            "system" => Ok(Self::System),
            "both" => Ok(Self::Both),
            _ => Err(()),
        }
    }
}

fn backend_targets(backend: NotificationBackend) -> (bool, bool) {
    match backend {
        NotificationBackend::None => (false, false),
        NotificationBackend::Log => (true, false),
        NotificationBackend::System => (false, true),
        NotificationBackend::Both => (true, true),
    }
}

#[derive(Debug, Clone)]
pub struct BackendNotifier {
    backend: NotificationBackend,
    display_duration_ms: u64,
}

impl BackendNotifier {
    pub fn new(backend: NotificationBackend, display_duration_ms: u64) -> Self {
        Self {
            backend,
            display_duration_ms,
        }
    }
}

impl Notifier for BackendNotifier {
    fn notify(&self, notice: &Notice) {
        let (send_log, send_system) = backend_targets(self.backend);
        if !send_log && !send_system {
            debug!(title = %notice.title, "notice skipped (backend is none)");
            return;
        }

        if send_log {
            error!(title = %notice.title, "{}", notice.message);
        }

        if send_system {
            send_system_notification(notice, self.display_duration_ms);
        }
    }
}

fn send_system_notification(notice: &Notice, display_duration_ms: u64) {
    #[cfg(any(target_os = "linux", target_os = "macos"))]
    {
        let timeout_ms = display_duration_ms.min(u32::MAX as u64) as u32;
        let result = notify_rust::Notification::new()
            .summary(&notice.title)
            .body(&notice.message)
            .icon("dialog-error")
            .timeout(notify_rust::Timeout::Milliseconds(timeout_ms))
            .show();

        if let Err(err) = result {
            warn!(error = %err, "failed to send system notification");
        }
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        let _ = display_duration_ms;
        debug!(title = %notice.title, "system notifications not supported on this OS");
    }
}

/// Keeps every notice in memory. Clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl MemoryNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|notices| notices.clone())
            .unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notice: &Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice.clone());
        }
    }
}
