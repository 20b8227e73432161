//! Unread badge output port.
//!
//! The dashboard shows the unread count on its favicon; a headless process
//! has no favicon, so the count goes out through this port and whatever
//! shell embeds the pipeline decides how to render it.

pub trait BadgeSink: Send + Sync {
    /// Replace the badge with `unread`; 0 clears it.
    fn set_count(&self, unread: u32);
}

/// Default sink for the daemon: just log the count.
pub struct LogBadgeSink;

impl BadgeSink for LogBadgeSink {
    fn set_count(&self, unread: u32) {
        tracing::debug!("Unread badge count: {}", unread);
    }
}
