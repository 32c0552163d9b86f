use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use unicode_width::UnicodeWidthChar;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// What a key press did to the draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// The key was not for the input box
    Ignored,
    Edited,
    /// The draft was taken for sending; it is already cleared
    Submit(String),
}

/// The message draft, its cursor, and the height of the box that shows it.
#[derive(Debug, Clone)]
pub struct InputController {
    draft: String,
    cursor: usize, // cursor position in draft, in chars
    width: u16,    // inner width of the input box
    min_height: u16,
    max_height: u16,
    height: u16,
}

impl InputController {
    pub fn new(min_height: u16, max_height: u16) -> Self {
        let mut input = Self {
            draft: String::new(),
            cursor: 0,
            width: 0,
            min_height,
            max_height: max_height.max(min_height),
            height: min_height,
        };
        input.recompute_height();
        input
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> InputAction {
        match key.code {
            KeyCode::Enter => {
                // Alt+Enter stands in for terminals that can't report Shift+Enter
                if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) {
                    self.insert_char('\n');
                    InputAction::Edited
                } else {
                    self.submit().map_or(InputAction::Ignored, InputAction::Submit)
                }
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.clear();
                InputAction::Edited
            }
            KeyCode::Char(_) if key.modifiers.contains(KeyModifiers::CONTROL) => InputAction::Ignored,
            KeyCode::Char(c) => {
                self.insert_char(c);
                InputAction::Edited
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let byte_pos = char_to_byte_index(&self.draft, self.cursor);
                    self.draft.remove(byte_pos);
                    self.recompute_height();
                }
                InputAction::Edited
            }
            KeyCode::Delete => {
                let char_count = self.draft.chars().count();
                if self.cursor < char_count {
                    let byte_pos = char_to_byte_index(&self.draft, self.cursor);
                    self.draft.remove(byte_pos);
                    self.recompute_height();
                }
                InputAction::Edited
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                InputAction::Edited
            }
            KeyCode::Right => {
                let char_count = self.draft.chars().count();
                self.cursor = (self.cursor + 1).min(char_count);
                InputAction::Edited
            }
            KeyCode::Home => {
                self.cursor = 0;
                InputAction::Edited
            }
            KeyCode::End => {
                self.cursor = self.draft.chars().count();
                InputAction::Edited
            }
            _ => InputAction::Ignored,
        }
    }

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.draft, self.cursor);
        self.draft.insert(byte_pos, c);
        self.cursor += 1;
        self.recompute_height();
    }

    /// Inserts pasted text at the cursor. Carriage returns become newlines.
    pub fn insert_str(&mut self, text: &str) {
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        let byte_pos = char_to_byte_index(&self.draft, self.cursor);
        self.draft.insert_str(byte_pos, &text);
        self.cursor += text.chars().count();
        self.recompute_height();
    }

    /// Takes the draft for sending. Blank drafts stay put and yield nothing.
    ///
    /// The returned text is the draft exactly as typed; the blank check is the
    /// only place whitespace is looked at.
    pub fn submit(&mut self) -> Option<String> {
        if self.draft.trim().is_empty() {
            return None;
        }
        let text = std::mem::take(&mut self.draft);
        self.cursor = 0;
        self.recompute_height();
        Some(text)
    }

    pub fn clear(&mut self) {
        self.draft.clear();
        self.cursor = 0;
        self.recompute_height();
    }

    /// Tells the controller how wide the box's text area is.
    pub fn set_width(&mut self, width: u16) {
        if self.width != width {
            self.width = width;
            self.recompute_height();
        }
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Box height in rows, borders included.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Draft split into display rows: each logical line is cut once it would
    /// overflow `width` columns, and a line that fills its last row exactly
    /// owns one more row so the cursor has somewhere to sit at its end.
    pub fn rows(&self) -> Vec<String> {
        self.layout().0
    }

    /// Cursor location as (row, column) within [`rows`](Self::rows), in
    /// display columns.
    pub fn cursor_position(&self) -> (u16, u16) {
        let (_, (row, col)) = self.layout();
        (
            u16::try_from(row).unwrap_or(u16::MAX),
            u16::try_from(col).unwrap_or(u16::MAX),
        )
    }

    /// Wraps the draft by display width and finds the cursor on the way.
    fn layout(&self) -> (Vec<String>, (usize, usize)) {
        let width = self.wrap_width();
        let mut rows = Vec::new();
        let mut cursor = (0, 0);
        let mut index = 0; // chars consumed, newlines included

        for line in self.draft.split('\n') {
            let mut row = String::new();
            let mut row_width = 0usize;
            for c in line.chars() {
                let w = c.width().unwrap_or(0);
                // A glyph wider than the box still gets a row of its own
                if row_width.saturating_add(w) > width && !row.is_empty() {
                    rows.push(std::mem::take(&mut row));
                    row_width = 0;
                }
                if index == self.cursor {
                    cursor = (rows.len(), row_width);
                }
                row.push(c);
                row_width += w;
                index += 1;
            }

            let full = row_width >= width;
            if index == self.cursor {
                cursor = if full {
                    (rows.len() + 1, 0)
                } else {
                    (rows.len(), row_width)
                };
            }
            rows.push(row);
            if full {
                rows.push(String::new());
            }
            index += 1;
        }
        (rows, cursor)
    }

    fn wrap_width(&self) -> usize {
        // Before the first render there is no width yet; treat it as unbounded.
        if self.width == 0 {
            usize::MAX
        } else {
            self.width as usize
        }
    }

    /// Always recomputed from the whole draft so deleting text shrinks the box.
    fn recompute_height(&mut self) {
        let rows = u16::try_from(self.rows().len()).unwrap_or(u16::MAX);
        let natural = rows.saturating_add(2);
        self.height = natural.clamp(self.min_height, self.max_height);
    }
}
