use beyond_core::fragment::PLAINTEXT;
use beyond_core::{parse, CopyCategory, CopyKey, FragmentKind, Sender};
use ratatui::{
    layout::{Constraint, Layout, Margin, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};

use crate::app::{App, InputMode, MessageLayout};
use crate::highlight::HighlightCache;

const CODE_BORDER: Color = Color::DarkGray;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // The input box needs its width before its height is asked for
    app.input.set_width(area.width.saturating_sub(2));
    let banner_height = if app.conversation.error().is_some() { 1 } else { 0 };

    let [header_area, chat_area, banner_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(banner_height),
        Constraint::Length(app.input.height()),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_conversation(app, frame, chat_area);
    if let Some(error) = app.conversation.error() {
        let banner = Paragraph::new(Line::from(Span::styled(
            format!(" {} ", error),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
        frame.render_widget(banner, banner_area);
    }
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Beyond Ai ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.endpoint.clone(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

/// Rendered conversation plus where each message ended up.
struct ConversationView {
    lines: Vec<Line<'static>>,
    layout: Vec<MessageLayout>,
    rows: u16,
    width: u16,
}

impl ConversationView {
    fn new(width: u16) -> Self {
        Self {
            lines: Vec::new(),
            layout: Vec::new(),
            rows: 0,
            width,
        }
    }

    fn push(&mut self, line: Line<'static>) {
        self.rows = self.rows.saturating_add(wrapped_rows(&line, self.width));
        self.lines.push(line);
    }
}

/// Rows a single line occupies once wrapped to `width`.
fn wrapped_rows(line: &Line<'static>, width: u16) -> u16 {
    let count = Paragraph::new(line.clone())
        .wrap(Wrap { trim: false })
        .line_count(width)
        .max(1);
    count.min(u16::MAX as usize) as u16
}

fn build_conversation(app: &App, highlights: &mut HighlightCache, width: u16) -> ConversationView {
    let mut view = ConversationView::new(width);
    let browsing = app.input_mode == InputMode::Normal;

    for (index, msg) in app.conversation.messages().iter().enumerate() {
        let start = view.rows;
        let selected = browsing && app.selected_message == Some(index);
        let mut code_rows = Vec::new();

        view.push(sender_line(msg.sender, selected));

        let fragments = parse(&msg.text);
        let mut nth_code = 0;
        for (f, fragment) in fragments.iter().enumerate() {
            match fragment.kind {
                FragmentKind::Text => {
                    // Fences usually sit on their own lines; drop the newline that touches them
                    let mut text = fragment.content.as_str();
                    if f > 0 && fragments[f - 1].is_code() {
                        text = text.strip_prefix('\n').unwrap_or(text);
                    }
                    if fragments.get(f + 1).is_some_and(|next| next.is_code()) {
                        text = text.strip_suffix('\n').unwrap_or(text);
                    }
                    if text.is_empty() && fragments.len() > 1 {
                        continue;
                    }
                    for line in text.split('\n') {
                        view.push(Line::from(line.to_string()));
                    }
                }
                FragmentKind::Code => {
                    code_rows.push(view.rows);
                    let focused = selected && app.selected_code == nth_code;
                    nth_code += 1;
                    let copied = app
                        .copy_state
                        .is_active(CopyKey::code(index, f), CopyCategory::Code);
                    let language = fragment.language.as_deref().unwrap_or(PLAINTEXT);
                    let body = highlights.get_or_highlight(index, f, &fragment.content, language);
                    push_code_block(&mut view, language, body, copied, focused);
                }
            }
        }

        // Only replies can be copied whole
        if msg.sender == Sender::Assistant {
            let copied = app
                .copy_state
                .is_active(CopyKey::message(index), CopyCategory::Message);
            view.push(Line::from(copy_button("[Copy Response]", copied, selected)));
        }
        view.push(Line::default());

        view.layout.push(MessageLayout {
            start,
            end: view.rows,
            code_rows,
        });
    }

    if app.conversation.is_waiting() {
        view.push(sender_line(Sender::Assistant, false));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        let pending = app.conversation.in_flight();
        let status = if pending > 1 {
            format!("Thinking{} ({} pending)", dots, pending)
        } else {
            format!("Thinking{}", dots)
        };
        view.push(Line::from(Span::styled(
            status,
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    view
}

fn sender_line(sender: Sender, selected: bool) -> Line<'static> {
    let color = match sender {
        Sender::User => Color::Cyan,
        Sender::Assistant => Color::Yellow,
    };
    let mut style = Style::default().fg(color).add_modifier(Modifier::BOLD);
    if selected {
        style = style.bg(Color::DarkGray);
    }
    let marker = if selected { "> " } else { "" };
    Line::from(Span::styled(
        format!("{}{}:", marker, sender.display_name()),
        style,
    ))
}

fn copy_button(label: &'static str, copied: bool, focused: bool) -> Span<'static> {
    let (text, mut style) = if copied {
        ("[Copied!]", Style::default().fg(Color::Green).bold())
    } else {
        (label, Style::default().fg(Color::Blue))
    };
    if focused {
        style = style.add_modifier(Modifier::REVERSED);
    }
    Span::styled(text, style)
}

fn push_code_block(
    view: &mut ConversationView,
    language: &str,
    body: &[Line<'static>],
    copied: bool,
    focused: bool,
) {
    let border = Style::default().fg(CODE_BORDER);

    view.push(Line::from(vec![
        Span::styled(format!("┌ {} ", language), border),
        copy_button("[Copy Code]", copied, focused),
    ]));
    for line in body {
        let mut spans = vec![Span::styled("│ ", border)];
        spans.extend(line.spans.iter().cloned());
        view.push(Line::from(spans));
    }
    view.push(Line::from(Span::styled("└", border)));
}

fn render_conversation(app: &mut App, frame: &mut Frame, area: Rect) {
    let border_color = if app.input_mode == InputMode::Normal {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Conversation ");

    let inner = block.inner(area);
    app.chat_area = Some(area);
    app.chat_height = inner.height;

    let mut highlights = std::mem::take(&mut app.highlights);
    let view = build_conversation(app, &mut highlights, inner.width);
    app.highlights = highlights;
    app.viewport
        .observe(app.conversation.len(), view.rows, inner.height);
    app.message_layout = view.layout;

    if view.lines.is_empty() {
        let placeholder = Paragraph::new("Ask Beyond Ai anything...")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let offset = app.viewport.offset();
    let chat = Paragraph::new(view.lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));
    frame.render_widget(chat, area);

    if view.rows > inner.height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("^"))
            .end_symbol(Some("v"));

        let mut scrollbar_state = ScrollbarState::new(app.viewport.max_offset() as usize)
            .position(offset as usize);

        frame.render_stateful_widget(
            scrollbar,
            area.inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message (Enter to send, Shift+Enter for newline) ");

    let inner_height = area.height.saturating_sub(2) as usize;
    let (cursor_row, cursor_col) = app.input.cursor_position();

    // Scroll rows so the cursor stays inside the box
    let scroll = (cursor_row as usize + 1).saturating_sub(inner_height);

    let input = if app.input.draft().is_empty() {
        Paragraph::new(Span::styled(
            "Type a message...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let lines: Vec<Line> = app
            .input
            .rows()
            .into_iter()
            .skip(scroll)
            .take(inner_height)
            .map(Line::from)
            .collect();
        // Cyan to match the "You:" label
        Paragraph::new(lines).style(Style::default().fg(Color::Cyan))
    };
    frame.render_widget(input.block(block), area);

    if editing && inner_height > 0 {
        let row = (cursor_row as usize - scroll) as u16;
        frame.set_cursor_position((area.x + cursor_col + 1, area.y + row + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" BROWSE ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" TYPE ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Shift+Enter ", key_style),
            Span::styled(" newline ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" browse ", label_style),
            Span::styled(" Ctrl+C ", key_style),
            Span::styled(" quit ", label_style),
        ],
        InputMode::Normal => {
            let mut hints = vec![
                Span::styled(" j/k ", key_style),
                Span::styled(" message ", label_style),
            ];
            if app.selected_code_count() > 0 {
                hints.extend(vec![
                    Span::styled(" [/] ", key_style),
                    Span::styled(" code ", label_style),
                    Span::styled(" y ", key_style),
                    Span::styled(" copy code ", label_style),
                ]);
            }
            hints.extend(vec![
                Span::styled(" c ", key_style),
                Span::styled(" copy ", label_style),
                Span::styled(" g/G ", key_style),
                Span::styled(" top/bottom ", label_style),
                Span::styled(" i ", key_style),
                Span::styled(" type ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ]);
            hints
        }
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}
