use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
};

use crate::app::{App, InputMode, Tab};
use crate::input::TextInput;
use crate::lifecycle::{Interaction, Outcome, ResultView};
use crate::markdown;
use crate::panels::ChatRole;
use crate::tone::Tone;
use unicode_width::UnicodeWidthChar;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, tab bar, body, footer
    let [header_area, tabs_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_tabs(app, frame, tabs_area);

    match app.tab {
        Tab::Chat => render_chat(app, frame, body_area),
        Tab::Analyze => render_analyze(app, frame, body_area),
        Tab::Generate => render_generate(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" FREY ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::raw("  "),
        Span::styled(app.api_url.clone(), Style::default().fg(Color::Gray)),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_tabs(app: &mut App, frame: &mut Frame, area: Rect) {
    app.tabs_area = Some(area);

    let titles = Tab::all().into_iter().map(|tab| {
        if app.is_loading(tab) {
            Line::from(tab.title()).italic()
        } else {
            Line::from(tab.title())
        }
    });

    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .style(Style::default().fg(Color::Gray))
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD | Modifier::REVERSED));

    frame.render_widget(tabs, area);
}

fn dots(app: &App) -> String {
    // Animated ellipsis: cycles through ".", "..", "..."
    ".".repeat((app.animation_frame as usize) + 1)
}

/// Rows `paragraph` occupies once wrapped to `width` columns, using the same
/// word wrapper that draws it. Must be called before a block is attached.
fn wrapped_height(paragraph: &Paragraph, width: u16) -> u16 {
    u16::try_from(paragraph.line_count(width)).unwrap_or(u16::MAX)
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    app.output_area = Some(chat_area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat.view_height = chat_area.height.saturating_sub(2);
    app.chat.view_width = chat_area.width.saturating_sub(2);

    let loading = app.chat.is_loading();
    let mut lines: Vec<Line<'static>> = Vec::new();

    if app.chat.entries().is_empty() && !loading {
        lines.push(Line::from(Span::styled(
            "Ask FREY anything...",
            Style::default().fg(Color::DarkGray),
        )));
    }

    for entry in app.chat.entries() {
        match entry.role {
            ChatRole::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                lines.extend(entry.content.lines().map(|line| Line::from(line.to_string())));
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    "FREY:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                if entry.failed {
                    lines.extend(
                        entry
                            .content
                            .lines()
                            .map(|line| Line::from(line.to_string()).fg(Color::Red)),
                    );
                } else {
                    lines.extend(markdown::render(&entry.content, app.chat.view_width));
                }
            }
        }
        lines.push(Line::default());
    }

    if loading {
        lines.push(Line::from(Span::styled(
            format!("FREY is typing{}", dots(app)),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    let max_scroll = wrapped_height(&chat, app.chat.view_width).saturating_sub(app.chat.view_height);
    if app.chat.follow || app.chat.scroll >= max_scroll {
        app.chat.scroll = max_scroll;
        app.chat.follow = true;
    }

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let chat = chat.block(chat_block).scroll((app.chat.scroll, 0));
    frame.render_widget(chat, chat_area);

    // Message input at the bottom, single line with horizontal scrolling
    let editing = app.input_mode == InputMode::Editing && !loading;
    let title = match &app.chat.notice {
        Some(notice) => Line::from(Span::styled(format!(" {} ", notice), Style::default().fg(Color::Red))),
        None if loading => Line::from(" Waiting for FREY... "),
        None => Line::from(" Message "),
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(editing)))
        .title(title);

    // Inner width = total width - 2 (for borders)
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) =
        visible_window(app.chat.input.value(), app.chat.input.cursor(), inner_width);

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);
    frame.render_widget(input, input_area);

    if editing {
        frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
    }
}

/// The part of a single-line `value` that fits in `width` cells with the
/// cursor (a char index) in view, and the cursor's cell offset within it.
fn visible_window(value: &str, cursor: usize, width: usize) -> (String, u16) {
    let chars: Vec<char> = value.chars().collect();
    let cursor = cursor.min(chars.len());
    let cells = |chars: &[char]| chars.iter().map(|c| c.width().unwrap_or(0)).sum::<usize>();

    // Keep one cell free for the cursor.
    let mut skip = 0;
    while skip < cursor && cells(&chars[skip..cursor]) >= width {
        skip += 1;
    }

    let mut used = 0;
    let visible = chars[skip..]
        .iter()
        .take_while(|c| {
            used += c.width().unwrap_or(0);
            used <= width
        })
        .collect();
    let column = u16::try_from(cells(&chars[skip..cursor])).unwrap_or(u16::MAX);
    (visible, column)
}

fn border_color(active: bool) -> Color {
    if active {
        Color::Yellow
    } else {
        Color::DarkGray
    }
}

/// Columns to skip so the cursor stays visible.
fn horizontal_offset(cursor: usize, width: usize) -> usize {
    if width == 0 || cursor < width {
        0
    } else {
        cursor - width + 1
    }
}

/// Multi-line form input. Scrolls both ways to keep the cursor in view.
fn render_form_input(
    frame: &mut Frame,
    area: Rect,
    input: &TextInput,
    title: &str,
    placeholder: &str,
    editing: bool,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(editing)))
        .title(title.to_string());

    let inner_height = area.height.saturating_sub(2) as usize;
    let inner_width = area.width.saturating_sub(2) as usize;
    let (line, col) = input.cursor_line_col();
    let row_offset = line.saturating_sub(inner_height.saturating_sub(1));
    let col_offset = horizontal_offset(col, inner_width);

    let paragraph = if input.value().is_empty() {
        Paragraph::new(Span::styled(placeholder.to_string(), Style::default().fg(Color::DarkGray)))
    } else {
        Paragraph::new(input.value().to_string())
            .style(Style::default().fg(Color::Cyan))
            .scroll((row_offset as u16, col_offset as u16))
    };
    frame.render_widget(paragraph.block(block), area);

    if editing {
        frame.set_cursor_position((
            area.x + 1 + (col - col_offset) as u16,
            area.y + 1 + (line - row_offset) as u16,
        ));
    }
}

/// Result area shared by the analyze and generate panels.
fn render_result(
    frame: &mut Frame,
    area: Rect,
    result: &mut ResultView,
    title: String,
    busy: Option<String>,
) {
    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);

    let (lines, color): (Vec<Line<'static>>, Color) = match (busy, result.outcome()) {
        (Some(text), _) => (
            vec![Line::from(Span::styled(
                text,
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ))],
            Color::DarkGray,
        ),
        (None, Some(Outcome::Failure(message))) => (
            message
                .lines()
                .map(|line| Line::from(line.to_string()).fg(Color::Red))
                .collect(),
            Color::Red,
        ),
        (None, Some(Outcome::Success(text))) => (markdown::render(text, inner_width), Color::Green),
        (None, None) => (
            vec![Line::from(Span::styled(
                "Nothing yet. Press Enter to submit.",
                Style::default().fg(Color::DarkGray),
            ))],
            Color::DarkGray,
        ),
    };

    let paragraph = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    let max_scroll = wrapped_height(&paragraph, inner_width).saturating_sub(inner_height);
    result.scroll = result.scroll.min(max_scroll);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title);

    let paragraph = paragraph.block(block).scroll((result.scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_analyze(app: &mut App, frame: &mut Frame, area: Rect) {
    let [input_area, result_area] = Layout::vertical([
        Constraint::Percentage(40),
        Constraint::Min(0),
    ])
    .areas(area);

    app.output_area = Some(result_area);

    let loading = app.analyze.is_loading();
    let editing = app.input_mode == InputMode::Editing && !loading;
    render_form_input(
        frame,
        input_area,
        &app.analyze.input,
        " Data ",
        "Paste CSV, JSON or plain text here...",
        editing,
    );

    let busy = loading.then(|| format!("Analyzing{}", dots(app)));
    render_result(frame, result_area, &mut app.analyze.result, " Report ".to_string(), busy);
}

fn render_tone_selector(current: Tone, locked: bool) -> Line<'static> {
    let mut spans = vec![Span::raw(" ")];
    for tone in Tone::all() {
        let style = if tone == current {
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else if locked {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!(" {} ", tone.label()), style));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

fn render_generate(app: &mut App, frame: &mut Frame, area: Rect) {
    let [tone_area, input_area, result_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Percentage(30),
        Constraint::Min(0),
    ])
    .areas(area);

    app.output_area = Some(result_area);

    let loading = app.generate.is_loading();
    let tone_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Tone (t / T) ");
    let tones = Paragraph::new(render_tone_selector(app.generate.tone, loading)).block(tone_block);
    frame.render_widget(tones, tone_area);

    let editing = app.input_mode == InputMode::Editing && !loading;
    render_form_input(
        frame,
        input_area,
        &app.generate.input,
        " Subject ",
        "Describe the subject and any writing instructions...",
        editing,
    );

    let title = match app.generate.tone_used {
        Some(tone) => format!(" Result ({}) ", tone),
        None => " Result ".to_string(),
    };
    let busy = loading.then(|| format!("Generating{}", dots(app)));
    render_result(frame, result_area, &mut app.generate.result, title, busy);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" EDIT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &'static str, label: &'static str| {
        [
            Span::styled(format!(" {} ", key), key_style),
            Span::styled(format!(" {} ", label), label_style),
        ]
    };

    let mut hints: Vec<Span> = Vec::new();
    match (app.tab, app.input_mode) {
        (Tab::Chat, InputMode::Editing) => {
            hints.extend(hint("Enter", "send"));
            hints.extend(hint("PgUp/PgDn", "scroll"));
            hints.extend(hint("Esc", "stop typing"));
        }
        (_, InputMode::Editing) => {
            hints.extend(hint("Enter", "submit"));
            hints.extend(hint("Alt+Enter", "new line"));
            hints.extend(hint("Esc", "stop typing"));
        }
        (tab, InputMode::Normal) => {
            hints.extend(hint("i", "type"));
            if tab != Tab::Chat {
                hints.extend(hint("Enter", "submit"));
            }
            if tab == Tab::Generate {
                hints.extend(hint("t/T", "tone"));
            }
            hints.extend(hint("j/k", "scroll"));
            hints.extend(hint("Tab", "panel"));
            hints.extend(hint("q", "quit"));
        }
    }

    let footer_content = Line::from(
        vec![Span::styled(mode_text, mode_style), Span::styled(" ", label_style)]
            .into_iter()
            .chain(hints)
            .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}
