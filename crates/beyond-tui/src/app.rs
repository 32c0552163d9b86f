use beyond_core::fragment::{code_indices, parse};
use beyond_core::{
    Clipboard, Config, ConversationStore, CopyCategory, CopyKey, CopyStateTracker,
    ExchangeOutcome, NetworkBridge, ScheduledClear, Sender, ViewportController,
};
use ratatui::layout::Rect;
use tokio::sync::mpsc;

use crate::highlight::HighlightCache;
use crate::input::InputController;
use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Browsing the conversation: select messages and copy them
    Normal,
    /// Typing into the message box
    Editing,
}

/// Where each message landed in the last rendered frame, in content rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLayout {
    pub start: u16,
    pub end: u16,
    /// First row of each code block's label line
    pub code_rows: Vec<u16>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    pub conversation: ConversationStore,
    pub input: InputController,
    pub viewport: ViewportController,
    pub copy_state: CopyStateTracker,

    // Selection (normal mode)
    pub selected_message: Option<usize>,
    pub selected_code: usize, // nth code block within the selected message

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
    tick_count: u64,

    // Layout from the last render, for scrolling and mouse hit-testing
    pub chat_area: Option<Rect>,
    pub chat_height: u16,
    pub message_layout: Vec<MessageLayout>,
    pub highlights: HighlightCache,

    pub endpoint: String,

    clipboard: Box<dyn Clipboard>,
    bridge: NetworkBridge,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        config: &Config,
        bridge: NetworkBridge,
        clipboard: Box<dyn Clipboard>,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            conversation: ConversationStore::new(),
            input: InputController::new(config.input_min_height, config.input_max_height),
            viewport: ViewportController::new(),
            copy_state: CopyStateTracker::new(config.copy_indicator()),

            selected_message: None,
            selected_code: 0,

            animation_frame: 0,
            tick_count: 0,

            chat_area: None,
            chat_height: 0,
            message_layout: Vec::new(),
            highlights: HighlightCache::default(),

            endpoint: config.endpoint.clone(),

            clipboard,
            bridge,
            events,
        }
    }

    /// Sends the draft if it isn't blank. Returns whether anything was sent.
    pub fn submit_draft(&mut self) -> bool {
        match self.input.submit() {
            Some(text) => {
                self.send(text);
                true
            }
            None => false,
        }
    }

    /// Records `text` as the user's message and starts the exchange in the
    /// background. The reply comes back as an [`AppEvent::Exchange`].
    pub fn send(&mut self, text: String) {
        let request = self.conversation.submit(text);
        let events = self.events.clone();
        self.bridge.dispatch(request, move |outcome| {
            let _ = events.send(AppEvent::Exchange(outcome));
        });
    }

    pub fn on_exchange(&mut self, outcome: ExchangeOutcome) {
        self.conversation.complete(outcome);
    }

    pub fn on_copy_expired(&mut self, clear: ScheduledClear) {
        self.copy_state.expire(clear);
    }

    /// Tick animation frame and scroll (called by Tick event).
    /// Returns whether anything visible moved.
    pub fn tick(&mut self) -> bool {
        self.tick_count = self.tick_count.wrapping_add(1);
        let mut changed = false;
        if self.conversation.is_waiting() && self.tick_count % 6 == 0 {
            self.animation_frame = (self.animation_frame + 1) % 3;
            changed = true;
        }
        self.viewport.tick() || changed
    }

    pub fn enter_normal_mode(&mut self) {
        self.input_mode = InputMode::Normal;
        if self.selected_message.is_none() && !self.conversation.is_empty() {
            self.select_message(self.conversation.len() - 1);
        }
    }

    pub fn enter_editing_mode(&mut self) {
        self.input_mode = InputMode::Editing;
    }

    // Message selection
    pub fn select_next_message(&mut self) {
        let len = self.conversation.len();
        if len > 0 {
            let next = self.selected_message.map_or(0, |i| (i + 1).min(len - 1));
            self.select_message(next);
        }
    }

    pub fn select_prev_message(&mut self) {
        let len = self.conversation.len();
        if len > 0 {
            let prev = self.selected_message.map_or(len - 1, |i| i.saturating_sub(1));
            self.select_message(prev);
        }
    }

    fn select_message(&mut self, index: usize) {
        if self.selected_message != Some(index) {
            self.selected_code = 0;
        }
        self.selected_message = Some(index);
        if let Some(layout) = self.message_layout.get(index) {
            self.viewport.reveal(layout.start, layout.end, self.chat_height);
        }
    }

    pub fn selected_code_count(&self) -> usize {
        self.selected_message
            .and_then(|i| self.conversation.get(i))
            .map_or(0, |msg| code_indices(&parse(&msg.text)).len())
    }

    pub fn select_next_code(&mut self) {
        let count = self.selected_code_count();
        if count > 0 {
            self.selected_code = (self.selected_code + 1).min(count - 1);
            self.reveal_selected_code();
        }
    }

    pub fn select_prev_code(&mut self) {
        if self.selected_code_count() > 0 {
            self.selected_code = self.selected_code.saturating_sub(1);
            self.reveal_selected_code();
        }
    }

    fn reveal_selected_code(&mut self) {
        let row = self
            .selected_message
            .and_then(|i| self.message_layout.get(i))
            .and_then(|layout| layout.code_rows.get(self.selected_code))
            .copied();
        if let Some(row) = row {
            self.viewport.reveal(row, row.saturating_add(1), self.chat_height);
        }
    }

    /// Copies the selected message. Only assistant replies can be copied whole.
    pub fn copy_selected_message(&mut self) -> bool {
        let Some(index) = self.selected_message else {
            return false;
        };
        let text = match self.conversation.get(index) {
            Some(msg) if msg.sender == Sender::Assistant => msg.text.clone(),
            _ => return false,
        };

        let clear = self.copy_state.copy(
            self.clipboard.as_mut(),
            &text,
            CopyKey::message(index),
            CopyCategory::Message,
        );
        self.schedule_clear(clear);
        true
    }

    /// Copies the selected code block of the selected message.
    pub fn copy_selected_code(&mut self) -> bool {
        let Some(index) = self.selected_message else {
            return false;
        };
        let Some(msg) = self.conversation.get(index) else {
            return false;
        };

        let fragments = parse(&msg.text);
        let Some(&fragment) = code_indices(&fragments).get(self.selected_code) else {
            return false;
        };

        let clear = self.copy_state.copy(
            self.clipboard.as_mut(),
            &fragments[fragment].content,
            CopyKey::code(index, fragment),
            CopyCategory::Code,
        );
        self.schedule_clear(clear);
        true
    }

    /// Posts the clear back into the event loop once its delay has passed.
    fn schedule_clear(&self, clear: ScheduledClear) {
        let events = self.events.clone();
        let deadline = tokio::time::Instant::now() + clear.delay;
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = events.send(AppEvent::CopyExpired(clear));
        });
    }

    // Conversation scrolling
    pub fn scroll_down(&mut self, rows: u16) {
        self.viewport.scroll_by(rows as i32);
    }

    pub fn scroll_up(&mut self, rows: u16) {
        self.viewport.scroll_by(-(rows as i32));
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }
}
