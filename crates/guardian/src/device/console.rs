//! Terminal renderings of the alert notice and transient feedback.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Permission, Result};
use crate::indicator::{Feedback, ForegroundIndicator, Notice};

/// Prints the alert notice to stderr.
#[derive(Debug)]
pub struct ConsoleIndicator {
    granted: bool,
    visible: AtomicBool,
}

impl ConsoleIndicator {
    /// Create an indicator.
    #[must_use]
    pub fn new(granted: bool) -> Self {
        Self {
            granted,
            visible: AtomicBool::new(false),
        }
    }

    /// Whether a notice is currently shown.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }
}

impl ForegroundIndicator for ConsoleIndicator {
    fn show(&self, notice: &Notice) -> Result<()> {
        if !self.granted {
            return Err(Error::PermissionDenied(Permission::Notifications));
        }
        self.visible.store(true, Ordering::SeqCst);
        eprintln!("[{}] {}", notice.title, notice.text);
        Ok(())
    }

    fn clear(&self) {
        if self.visible.swap(false, Ordering::SeqCst) {
            eprintln!("[alert cleared]");
        }
    }
}

/// Prints transient messages to stderr.
#[derive(Debug, Default)]
pub struct ConsoleFeedback;

impl Feedback for ConsoleFeedback {
    fn notify(&self, message: &str) {
        eprintln!(">> {message}");
    }
}
