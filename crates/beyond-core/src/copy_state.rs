//! "Copied!" indicators for whole messages and code blocks.
//!
//! Each category owns exactly one slot. A copy overwrites the slot and asks the
//! caller to schedule a clear for the key it wrote; clears for keys that are no
//! longer in the slot do nothing, so timers never need cancelling.

use std::time::Duration;

use crate::clipboard::Clipboard;

pub const DEFAULT_CLEAR_AFTER: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CopyCategory {
    Message,
    Code,
}

/// Identifies what was copied: a message, or one fragment inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CopyKey {
    pub message: usize,
    pub fragment: Option<usize>,
}

impl CopyKey {
    pub fn message(message: usize) -> Self {
        Self {
            message,
            fragment: None,
        }
    }

    pub fn code(message: usize, fragment: usize) -> Self {
        Self {
            message,
            fragment: Some(fragment),
        }
    }
}

/// A clear the caller must run once `delay` has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledClear {
    pub category: CopyCategory,
    pub key: CopyKey,
    pub delay: Duration,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct IndicatorSlot {
    key: Option<CopyKey>,
}

impl IndicatorSlot {
    fn set(&mut self, key: CopyKey) {
        self.key = Some(key);
    }

    fn clear_if(&mut self, key: CopyKey) -> bool {
        if self.key == Some(key) {
            self.key = None;
            true
        } else {
            false
        }
    }

    fn holds(&self, key: CopyKey) -> bool {
        self.key == Some(key)
    }
}

#[derive(Debug, Clone)]
pub struct CopyStateTracker {
    message: IndicatorSlot,
    code: IndicatorSlot,
    clear_after: Duration,
}

impl Default for CopyStateTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CLEAR_AFTER)
    }
}

impl CopyStateTracker {
    pub fn new(clear_after: Duration) -> Self {
        Self {
            message: IndicatorSlot::default(),
            code: IndicatorSlot::default(),
            clear_after,
        }
    }

    /// Writes `content` to the clipboard and marks `key` as copied.
    ///
    /// Clipboard failures are logged and otherwise ignored; the indicator is
    /// set either way.
    pub fn copy(
        &mut self,
        clipboard: &mut dyn Clipboard,
        content: &str,
        key: CopyKey,
        category: CopyCategory,
    ) -> ScheduledClear {
        if let Err(e) = clipboard.set_text(content) {
            tracing::warn!(?category, ?key, "copy to clipboard failed: {:#}", e);
        }
        self.slot_mut(category).set(key);
        tracing::debug!(?category, ?key, bytes = content.len(), "copied");

        ScheduledClear {
            category,
            key,
            delay: self.clear_after,
        }
    }

    /// Runs a scheduled clear. Returns whether the slot actually changed.
    pub fn expire(&mut self, clear: ScheduledClear) -> bool {
        self.slot_mut(clear.category).clear_if(clear.key)
    }

    pub fn is_active(&self, key: CopyKey, category: CopyCategory) -> bool {
        self.slot(category).holds(key)
    }

    fn slot(&self, category: CopyCategory) -> &IndicatorSlot {
        match category {
            CopyCategory::Message => &self.message,
            CopyCategory::Code => &self.code,
        }
    }

    fn slot_mut(&mut self, category: CopyCategory) -> &mut IndicatorSlot {
        match category {
            CopyCategory::Message => &mut self.message,
            CopyCategory::Code => &mut self.code,
        }
    }
}
