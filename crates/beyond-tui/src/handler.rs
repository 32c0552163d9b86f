use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, InputMode};
use crate::input::InputAction;
use crate::tui::AppEvent;

/// Rows moved per mouse wheel notch
const WHEEL_ROWS: u16 = 3;

/// Applies one event to the app. Returns whether the screen needs redrawing.
pub fn handle_event(app: &mut App, event: AppEvent) -> Result<bool> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => {
            app.enter_editing_mode();
            app.input.insert_str(&text);
        }
        AppEvent::Resize(_, _) => {}
        // Ticks only matter while something is animating
        AppEvent::Tick => return Ok(app.tick()),
        AppEvent::Exchange(outcome) => app.on_exchange(outcome),
        AppEvent::CopyExpired(clear) => app.on_copy_expired(clear),
    }
    Ok(true)
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }
    match key.code {
        KeyCode::PageDown => return app.scroll_half_page_down(),
        KeyCode::PageUp => return app.scroll_half_page_up(),
        _ => {}
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        app.enter_normal_mode();
        return;
    }

    if let InputAction::Submit(text) = app.input.handle_key(key) {
        app.send(text);
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,

        // Back to typing
        KeyCode::Char('i') | KeyCode::Char('a') | KeyCode::Enter | KeyCode::Esc => {
            app.enter_editing_mode();
        }

        // Half-page scroll (must be before plain 'd'/'u' if those are ever bound)
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_down();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_up();
        }

        // Message selection
        KeyCode::Char('j') | KeyCode::Down => app.select_next_message(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev_message(),

        // Code block selection within the selected message
        KeyCode::Char(']') | KeyCode::Char('n') | KeyCode::Tab => app.select_next_code(),
        KeyCode::Char('[') | KeyCode::Char('N') | KeyCode::BackTab => app.select_prev_code(),

        // Copy actions
        KeyCode::Char('c') => {
            app.copy_selected_message();
        }
        KeyCode::Char('y') => {
            app.copy_selected_code();
        }

        // Jump to top/bottom of the conversation
        KeyCode::Char('g') | KeyCode::Home => app.viewport.scroll_to_top(),
        KeyCode::Char('G') | KeyCode::End => app.viewport.scroll_to_bottom(),

        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(WHEEL_ROWS),
        MouseEventKind::ScrollUp => app.scroll_up(WHEEL_ROWS),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use beyond_core::conversation::FAILURE_BANNER;
    use beyond_core::{
        ChatError, ChatService, Clipboard, Config, CopyCategory, CopyKey, NetworkBridge, Sender,
    };
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Replies with the message reversed; fails on "fail".
    struct ReverseService;

    #[async_trait]
    impl ChatService for ReverseService {
        async fn send(&self, message: &str) -> Result<String, ChatError> {
            if message == "fail" {
                Err(ChatError::Status {
                    status: 502,
                    body: "bad gateway".to_string(),
                })
            } else {
                Ok(message.chars().rev().collect())
            }
        }
    }

    #[derive(Clone, Default)]
    struct SharedClipboard(Rc<RefCell<Vec<String>>>);

    impl Clipboard for SharedClipboard {
        fn set_text(&mut self, text: &str) -> anyhow::Result<()> {
            self.0.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    fn test_app() -> (App, mpsc::UnboundedReceiver<AppEvent>, SharedClipboard) {
        let (tx, rx) = mpsc::unbounded_channel();
        let clipboard = SharedClipboard::default();
        let app = App::new(
            &Config::default(),
            NetworkBridge::new(Arc::new(ReverseService)),
            Box::new(clipboard.clone()),
            tx,
        );
        (app, rx, clipboard)
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_event(app, AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))).unwrap();
    }

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    /// Feeds the next event from the loop back into the app.
    async fn pump(app: &mut App, rx: &mut mpsc::UnboundedReceiver<AppEvent>) {
        let event = rx.recv().await.expect("event channel closed");
        handle_event(app, event).unwrap();
    }

    #[tokio::test]
    async fn test_enter_sends_and_reply_arrives() {
        let (mut app, mut rx, _) = test_app();
        type_str(&mut app, "olleh");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.conversation.len(), 1);
        assert_eq!(app.input.draft(), "");
        assert!(app.conversation.is_waiting());

        pump(&mut app, &mut rx).await;
        let reply = app.conversation.get(1).unwrap();
        assert_eq!(reply.sender, Sender::Assistant);
        assert_eq!(reply.text, "hello");
        assert!(!app.conversation.is_waiting());
    }

    #[tokio::test]
    async fn test_whitespace_draft_is_not_sent() {
        let (mut app, _rx, _) = test_app();
        type_str(&mut app, "   ");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.conversation.len(), 0);
        assert!(!app.submit_draft());
    }

    #[tokio::test]
    async fn test_shift_enter_adds_newline_without_sending() {
        let (mut app, _rx, _) = test_app();
        type_str(&mut app, "first");
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT)),
        )
        .unwrap();
        type_str(&mut app, "second");

        assert_eq!(app.conversation.len(), 0);
        assert_eq!(app.input.draft(), "first\nsecond");
    }

    #[tokio::test]
    async fn test_failure_then_success_toggles_banner() {
        let (mut app, mut rx, _) = test_app();
        type_str(&mut app, "fail");
        press(&mut app, KeyCode::Enter);
        pump(&mut app, &mut rx).await;

        assert_eq!(app.conversation.len(), 1);
        assert_eq!(app.conversation.error(), Some(FAILURE_BANNER));
        assert_eq!(app.input.draft(), "", "draft is not restored on failure");

        type_str(&mut app, "ok");
        press(&mut app, KeyCode::Enter);
        pump(&mut app, &mut rx).await;

        assert_eq!(app.conversation.len(), 3);
        assert_eq!(app.conversation.error(), None);
    }

    #[tokio::test]
    async fn test_paste_switches_to_editing() {
        let (mut app, _rx, _) = test_app();
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.input_mode, InputMode::Normal);

        handle_event(&mut app, AppEvent::Paste("line\r\nnext".to_string())).unwrap();
        assert_eq!(app.input_mode, InputMode::Editing);
        assert_eq!(app.input.draft(), "line\nnext");
    }

    #[tokio::test]
    async fn test_only_assistant_messages_copy_whole() {
        let (mut app, mut rx, clipboard) = test_app();
        type_str(&mut app, "cba");
        press(&mut app, KeyCode::Enter);
        pump(&mut app, &mut rx).await;

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.selected_message, Some(1));
        press(&mut app, KeyCode::Char('c'));
        assert_eq!(*clipboard.0.borrow(), vec!["abc".to_string()]);
        assert!(app.copy_state.is_active(CopyKey::message(1), CopyCategory::Message));

        press(&mut app, KeyCode::Char('k'));
        assert_eq!(app.selected_message, Some(0));
        assert!(!app.copy_selected_message());
        assert_eq!(clipboard.0.borrow().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_code_copy_indicator_last_writer_wins_and_expires() {
        let (mut app, mut rx, clipboard) = test_app();
        // Reversed by the service into two fenced blocks.
        let reply = "```py\nx=1\n```\n```sh\nls\n```";
        let reversed: String = reply.chars().rev().collect();
        app.send(reversed);
        pump(&mut app, &mut rx).await;
        assert_eq!(app.conversation.get(1).unwrap().text, reply);

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.selected_code_count(), 2);

        let a = CopyKey::code(1, 0);
        let b = CopyKey::code(1, 2);

        press(&mut app, KeyCode::Char('y'));
        assert!(app.copy_state.is_active(a, CopyCategory::Code));

        tokio::time::advance(Duration::from_millis(500)).await;
        press(&mut app, KeyCode::Char(']'));
        press(&mut app, KeyCode::Char('y'));
        let copied_b_at = tokio::time::Instant::now();

        assert!(!app.copy_state.is_active(a, CopyCategory::Code));
        assert!(app.copy_state.is_active(b, CopyCategory::Code));
        assert_eq!(*clipboard.0.borrow(), vec!["x=1\n".to_string(), "ls\n".to_string()]);

        // A's stale timer fires first and must leave B alone.
        pump(&mut app, &mut rx).await;
        assert!(app.copy_state.is_active(b, CopyCategory::Code));

        pump(&mut app, &mut rx).await;
        assert!(!app.copy_state.is_active(b, CopyCategory::Code));
        let elapsed = copied_b_at.elapsed();
        assert!(
            elapsed >= Duration::from_millis(1500) && elapsed < Duration::from_millis(1510),
            "cleared after {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_message_and_code_indicators_independent() {
        let (mut app, mut rx, _) = test_app();
        let reply = "see ```\ncode```";
        app.send(reply.chars().rev().collect());
        pump(&mut app, &mut rx).await;

        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('y'));
        press(&mut app, KeyCode::Char('c'));

        assert!(app.copy_state.is_active(CopyKey::code(1, 1), CopyCategory::Code));
        assert!(app.copy_state.is_active(CopyKey::message(1), CopyCategory::Message));
    }

    #[tokio::test]
    async fn test_ticks_redraw_only_while_animating() {
        let (mut app, _rx, _) = test_app();
        for _ in 0..12 {
            assert!(!handle_event(&mut app, AppEvent::Tick).unwrap());
        }

        type_str(&mut app, "hi");
        press(&mut app, KeyCode::Enter);
        // The reply is left unread, so "Thinking" keeps animating every 6th tick.
        let redraws = (0..12)
            .filter(|_| handle_event(&mut app, AppEvent::Tick).unwrap())
            .count();
        assert_eq!(redraws, 2);
        assert!(handle_event(&mut app, AppEvent::Resize(80, 24)).unwrap());
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_from_any_mode() {
        let (mut app, _rx, _) = test_app();
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        )
        .unwrap();
        assert!(app.should_quit);
    }
}
