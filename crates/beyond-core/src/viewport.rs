//! Scroll position of the conversation pane.
//!
//! Offsets are in rendered rows. The controller only chases the bottom when the
//! conversation gains a message; redraws for any other reason leave the user's
//! scroll position alone.

#[derive(Debug, Clone, Default)]
pub struct ViewportController {
    offset: u16,
    max_offset: u16,
    target: Option<u16>,
    observed_len: usize,
}

impl ViewportController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the latest layout into the controller. Called once per frame.
    ///
    /// Returns true when the conversation grew since the last call and an
    /// animated scroll to the bottom was started.
    pub fn observe(&mut self, conversation_len: usize, content_rows: u16, viewport_rows: u16) -> bool {
        self.max_offset = content_rows.saturating_sub(viewport_rows);
        self.offset = self.offset.min(self.max_offset);

        let grew = conversation_len > self.observed_len;
        if grew {
            self.observed_len = conversation_len;
            self.target = Some(self.max_offset);
        } else if let Some(target) = self.target {
            self.target = Some(target.min(self.max_offset));
        }
        grew
    }

    /// Advances an in-progress scroll animation by one step.
    ///
    /// Each step covers half the remaining distance, at least one row.
    pub fn tick(&mut self) -> bool {
        let Some(target) = self.target else {
            return false;
        };

        if self.offset == target {
            self.target = None;
            return false;
        }

        let distance = self.offset.abs_diff(target);
        let step = (distance / 2).max(1);
        self.offset = if self.offset < target {
            self.offset + step
        } else {
            self.offset - step
        };
        if self.offset == target {
            self.target = None;
        }
        true
    }

    /// Manual scroll; cancels any animation.
    pub fn scroll_by(&mut self, delta: i32) {
        self.target = None;
        let next = (self.offset as i32 + delta).clamp(0, self.max_offset as i32);
        self.offset = next as u16;
    }

    pub fn scroll_to_top(&mut self) {
        self.target = None;
        self.offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.target = None;
        self.offset = self.max_offset;
    }

    /// Scrolls just enough to bring the row range `[start, end)` into view.
    pub fn reveal(&mut self, start: u16, end: u16, viewport_rows: u16) {
        self.target = None;
        if start < self.offset {
            self.offset = start;
        } else if end > self.offset.saturating_add(viewport_rows) {
            // A range taller than the viewport shows its first rows.
            self.offset = end.saturating_sub(viewport_rows).min(start);
        }
        self.offset = self.offset.min(self.max_offset);
    }

    pub fn offset(&self) -> u16 {
        self.offset
    }

    pub fn max_offset(&self) -> u16 {
        self.max_offset
    }
}
