//! Toast-equivalent user notices.

use serde::Serialize;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
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
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);

    fn success(&self, message: &str) {
        self.notify(Notice::new(NoticeLevel::Success, message));
    }

    fn warning(&self, message: &str) {
        self.notify(Notice::new(NoticeLevel::Warning, message));
    }

    fn error(&self, message: &str) {
        self.notify(Notice::new(NoticeLevel::Error, message));
    }
}

/// Keeps every notice in memory; the CLI prints them at the end of a command.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn take(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|mut g| std::mem::take(&mut *g))
            .unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notice: Notice) {
        tracing::debug!(target: "notice", level = ?notice.level, "{}", notice.message);
        if let Ok(mut g) = self.notices.lock() {
            g.push(notice);
        }
    }
}
