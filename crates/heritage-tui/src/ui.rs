use heritage_core::{ChatRole, FilterControl, QaBackend};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, Clear, List, ListItem, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Wrap,
    },
};

use unicode_width::UnicodeWidthChar;

use crate::app::{App, Focus};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let after_open = &rest[start + 2..];
        let Some(len) = after_open.find("**") else {
            break;
        };
        if len == 0 {
            // "****" is not a bold run
            spans.push(Span::raw(rest[..start + 4].to_string()));
            rest = &rest[start + 4..];
            continue;
        }

        if start > 0 {
            spans.push(Span::raw(rest[..start].to_string()));
        }
        spans.push(Span::styled(
            after_open[..len].to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        rest = &after_open[len + 2..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render<B: QaBackend>(app: &mut App<B>, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, messages, filters, input, footer
    let [header_area, chat_area, filters_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_filters(app, frame, filters_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.focus != Focus::Input {
        render_filter_picker(app, frame, chat_area);
    }
}

fn render_header<B: QaBackend>(app: &App<B>, frame: &mut Frame, area: Rect) {
    let pending = app.controller.pending();
    let pending_indicator = if pending > 0 {
        format!(" [{} pending]", pending)
    } else {
        String::new()
    };

    let title = Line::from(vec![
        Span::styled(" World Heritage Q&A ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.server_url.clone(), Style::default().fg(Color::Gray)),
        Span::styled(pending_indicator, Style::default().fg(Color::Yellow)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn chat_text<B: QaBackend>(app: &App<B>) -> Text<'static> {
    let messages = app.controller.log().messages();
    if messages.is_empty() {
        return Text::from(Span::styled(
            "Ask a question about UNESCO World Heritage sites...",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in messages {
        match msg.role {
            ChatRole::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                for line in msg.content.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    "AI:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                if msg.is_thinking() {
                    // Animated ellipsis: cycles through ".", "..", "..."
                    let dots = ".".repeat((app.animation_frame as usize) + 1);
                    lines.push(Line::from(Span::styled(
                        dots,
                        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                    )));
                } else {
                    for line in msg.content.lines() {
                        lines.push(parse_markdown_line(line));
                    }
                }
            }
        }
        if msg.content.is_empty() {
            lines.push(Line::default());
        }
        lines.push(Line::default());
    }

    Text::from(lines)
}

fn render_chat<B: QaBackend>(app: &mut App<B>, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);
    // Inner size minus borders, for scroll calculations
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let chat = Paragraph::new(chat_text(app)).wrap(Wrap { trim: true });

    // Rows as the paragraph will actually wrap them, so the tail is reachable
    let total_lines = chat.line_count(app.chat_width);
    app.chat_total_lines = u16::try_from(total_lines).unwrap_or(u16::MAX);
    app.sync_chat_scroll();

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let chat = chat.block(chat_block).scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);

    if app.chat_total_lines > app.chat_height {
        let mut scrollbar_state = ScrollbarState::new(app.chat_total_lines.saturating_sub(app.chat_height) as usize)
            .position(app.chat_scroll as usize);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(None)
            .end_symbol(None);
        frame.render_stateful_widget(scrollbar, area, &mut scrollbar_state);
    }
}

fn render_filters<B: QaBackend>(app: &App<B>, frame: &mut Frame, area: Rect) {
    let [country_area, category_area] = Layout::horizontal([
        Constraint::Percentage(50),
        Constraint::Percentage(50),
    ])
    .areas(area);

    let filters = app.controller.filters();
    render_filter_box(&filters.country, app.focus == Focus::Country, frame, country_area);
    render_filter_box(&filters.category, app.focus == Focus::Category, frame, category_area);
}

fn render_filter_box(control: &FilterControl, focused: bool, frame: &mut Frame, area: Rect) {
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} ({}) ", control.label(), control.options().len()));

    let value_style = if control.value().is_empty() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Green)
    };
    let value = Paragraph::new(Line::from(vec![
        Span::styled(control.display_value().to_string(), value_style),
        Span::styled(" ▾", Style::default().fg(Color::DarkGray)),
    ]))
    .block(block);

    frame.render_widget(value, area);
}

fn render_filter_picker<B: QaBackend>(app: &mut App<B>, frame: &mut Frame, area: Rect) {
    let Some(control) = app.focused_filter() else {
        return;
    };

    // Anchor the popup to the bottom of the message pane, just above the filter boxes
    let popup_width = 40.min(area.width);
    let popup_height = (control.options().len() as u16 + 3).min(area.height);
    let popup_x = match app.focus {
        Focus::Category => area.x + area.width / 2,
        _ => area.x,
    };
    let popup_y = area.y + area.height.saturating_sub(popup_height);
    let popup_area = Rect::new(popup_x, popup_y, popup_width.min(area.right() - popup_x), popup_height);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {} (j/k to choose, Enter to close) ", control.label()));

    let items: Vec<ListItem> = std::iter::once("All")
        .chain(control.options().iter().map(String::as_str))
        .map(|option| ListItem::new(format!(" {} ", option)))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);
    frame.render_stateful_widget(list, popup_area, &mut app.picker_state);
}

fn render_input<B: QaBackend>(app: &App<B>, frame: &mut Frame, area: Rect) {
    let editing = app.focus == Focus::Input;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Ask (Enter to send) ");

    // Horizontal scroll keeps the cursor inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) = input_window(app.controller.input(), app.input_cursor, inner_width);

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    if editing {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

/// The part of `input` that fits in `width` terminal columns with the cursor
/// in view, and the cursor's column inside it. Wide characters take two columns.
fn input_window(input: &str, cursor: usize, width: usize) -> (String, u16) {
    let chars: Vec<char> = input.chars().collect();
    let cursor = cursor.min(chars.len());
    let columns = |c: &char| c.width().unwrap_or(0);

    // One cell is kept free for the cursor itself
    let mut start = 0;
    let mut before: usize = chars[..cursor].iter().map(columns).sum();
    while start < cursor && before + 1 > width {
        before -= columns(&chars[start]);
        start += 1;
    }

    let mut visible = String::new();
    let mut used = 0;
    for c in &chars[start..] {
        let w = columns(c);
        if used + w > width {
            break;
        }
        used += w;
        visible.push(*c);
    }

    (visible, u16::try_from(before).unwrap_or(u16::MAX))
}

fn render_footer<B: QaBackend>(app: &App<B>, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.focus {
        Focus::Input => (" ASK ", Style::default().bg(Color::Yellow).fg(Color::Black)),
        Focus::Country | Focus::Category => (" FILTER ", Style::default().bg(Color::Blue).fg(Color::White)),
    };

    let hints = match app.focus {
        Focus::Input => " Enter send | Tab filters | PgUp/PgDn scroll | Esc quit",
        Focus::Country | Focus::Category => " j/k choose | Enter back to input | Tab next | Esc quit",
    };

    let footer = Line::from(vec![
        Span::styled(mode_text, mode_style),
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
    ]);

    frame.render_widget(Paragraph::new(footer), area);
}
