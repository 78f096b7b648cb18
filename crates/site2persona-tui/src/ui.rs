use std::time::Instant;

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use site2persona_core::loader::LOADER_STEPS;
use site2persona_core::result_view::{listed_products, summary_cards};
use site2persona_core::{ChatRole, WorkflowPhase};

use crate::app::{App, FocusPane, InputMode};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let banner_height = if app.phase() == WorkflowPhase::Error { 3 } else { 0 };

    let [header_area, form_area, banner_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(banner_height),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_url_form(app, frame, form_area);
    if banner_height > 0 {
        render_error_banner(app, frame, banner_area);
    }

    app.result_area = None;
    app.chat_area = None;
    match app.phase() {
        WorkflowPhase::Idle | WorkflowPhase::Error => render_hero(app, frame, body_area),
        WorkflowPhase::Analyzing => render_loader(app, frame, body_area),
        WorkflowPhase::Success => render_success(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
        Span::styled(" Site", Style::default().fg(Color::White).bold()),
        Span::styled("2", Style::default().fg(Color::Cyan).bold()),
        Span::styled("Persona ", Style::default().fg(Color::White).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!("  {}", app.controller.service().model()),
            Style::default().fg(Color::Gray),
        ),
    ];
    if app.api_key_missing {
        spans.push(Span::styled(
            "  [no API key: set GEMINI_API_KEY]",
            Style::default().fg(Color::LightRed),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_url_form(app: &App, frame: &mut Frame, area: Rect) {
    let [input_area, button_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(16)]).areas(area);

    let focused = app.focus == FocusPane::Url;
    let editing = focused && app.input_mode == InputMode::Editing;
    let border_color = if editing {
        Color::Yellow
    } else if focused {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Website URL ");

    // Horizontal scrolling keeps the cursor visible
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width > 0 && app.url_cursor >= inner_width {
        app.url_cursor - inner_width + 1
    } else {
        0
    };

    let text = if app.url_input.is_empty() {
        Span::styled("example.com", Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(
            app.url_input.chars().skip(scroll_offset).take(inner_width).collect::<String>(),
            Style::default().fg(Color::Cyan),
        )
    };
    frame.render_widget(Paragraph::new(text).block(block), input_area);

    if editing {
        let cursor_x = (app.url_cursor - scroll_offset) as u16;
        frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
    }

    let (label, style) = if app.phase() == WorkflowPhase::Analyzing {
        ("Scanning...", Style::default().fg(Color::DarkGray))
    } else if app.can_submit() {
        ("Analyze", Style::default().fg(Color::Black).bg(Color::Cyan).bold())
    } else {
        ("Analyze", Style::default().fg(Color::DarkGray))
    };
    let button = Paragraph::new(Span::styled(format!(" {} ", label), style))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::DarkGray)));
    frame.render_widget(button, button_area);
}

fn render_error_banner(app: &App, frame: &mut Frame, area: Rect) {
    let message = app.controller.error_message().unwrap_or_default();
    let banner = Paragraph::new(Line::from(vec![
        Span::styled(" ! ", Style::default().fg(Color::White).bg(Color::Red).bold()),
        Span::raw(" "),
        Span::styled(message.to_string(), Style::default().fg(Color::LightRed)),
    ]))
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Red)));
    frame.render_widget(banner, area);
}

fn render_hero(app: &App, frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::default(),
        Line::from(Span::styled(
            format!("Powered by {}", app.controller.service().model()),
            Style::default().fg(Color::Cyan),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Turn any website into a",
            Style::default().fg(Color::White).bold(),
        )),
        Line::from(Span::styled(
            "Sales Agent Prompt",
            Style::default().fg(Color::Cyan).bold(),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Enter a company URL. The model will research the site, understand the product,",
            Style::default().fg(Color::Gray),
        )),
        Line::from(Span::styled(
            "and generate a system instruction for your AI sales agent.",
            Style::default().fg(Color::Gray),
        )),
    ];

    let hero = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(hero, area);
}

fn render_loader(app: &App, frame: &mut Frame, area: Rect) {
    let spinner = ["◐", "◓", "◑"][app.animation_frame as usize % 3];

    let bar: Vec<Span> = (0..LOADER_STEPS.len())
        .flat_map(|idx| {
            let segment = if app.loader.is_reached(idx) {
                Span::styled("━━━━━━", Style::default().fg(Color::Cyan))
            } else {
                Span::styled("──", Style::default().fg(Color::DarkGray))
            };
            [segment, Span::raw(" ")]
        })
        .collect();

    let lines = vec![
        Line::from(Span::styled(spinner, Style::default().fg(Color::Cyan).bold())),
        Line::default(),
        Line::from(Span::styled(
            "Building your Sales Agent",
            Style::default().fg(Color::White).bold(),
        )),
        Line::from(Span::styled(app.loader.caption(), Style::default().fg(Color::Gray))),
        Line::default(),
        Line::from(bar),
    ];

    let [_, center, _] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(lines.len() as u16),
        Constraint::Min(0),
    ])
    .areas(area);

    frame.render_widget(
        Paragraph::new(Text::from(lines)).alignment(Alignment::Center),
        center,
    );
}

fn render_success(app: &mut App, frame: &mut Frame, area: Rect) {
    let [result_area, chat_area] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area);

    app.result_area = Some(result_area);
    app.chat_area = Some(chat_area);

    render_result(app, frame, result_area);
    render_chat(app, frame, chat_area);
}

fn render_result(app: &App, frame: &mut Frame, area: Rect) {
    let Some(analysis) = app.controller.analysis() else {
        return;
    };

    let [cards_area, detail_area] =
        Layout::vertical([Constraint::Length(4), Constraint::Min(0)]).areas(area);

    // Summary cards
    let card_areas = Layout::horizontal([Constraint::Ratio(1, 4); 4]).split(cards_area);
    for (card, card_area) in summary_cards(analysis).iter().zip(card_areas.iter()) {
        let widget = Paragraph::new(Span::styled(
            card.value.clone(),
            Style::default().fg(Color::White).bold(),
        ))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(
                    format!(" {} ", card.title.to_uppercase()),
                    Style::default().fg(Color::Gray),
                )),
        );
        frame.render_widget(widget, *card_area);
    }

    // Profile and prompt
    let section = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled(analysis.name.clone(), Style::default().fg(Color::White).bold())),
        Line::from(Span::styled(analysis.description.clone(), Style::default().fg(Color::Gray))),
        Line::default(),
        Line::from(Span::styled("KEY SELLING POINTS", section)),
    ];
    for point in &analysis.key_selling_points {
        lines.push(Line::from(vec![
            Span::styled(" ✓ ", Style::default().fg(Color::Green)),
            Span::raw(point.clone()),
        ]));
    }
    lines.push(Line::default());
    lines.push(Line::from(Span::styled("IDENTIFIED PRODUCTS", section)));
    for (name, description) in listed_products(analysis) {
        lines.push(Line::from(vec![
            Span::styled(" • ", Style::default().fg(Color::Cyan)),
            Span::styled(name, Style::default().bold()),
            Span::raw(": "),
            Span::raw(description),
        ]));
    }
    lines.push(Line::default());

    let arrow = if app.result_view.show_prompt { "▾" } else { "▸" };
    lines.push(Line::from(vec![
        Span::styled(format!("{} Generated System Prompt ", arrow), section),
        Span::styled(" Ready to Use ", Style::default().fg(Color::Black).bg(Color::Cyan)),
    ]));
    if app.result_view.show_prompt {
        let copy_hint = if app.result_view.is_copied(Instant::now()) {
            Span::styled("✓ Copied!", Style::default().fg(Color::Green).bold())
        } else {
            Span::styled("c: Copy Code", Style::default().fg(Color::DarkGray))
        };
        lines.push(Line::from(copy_hint));
        lines.push(Line::default());
        for line in analysis.generated_system_instruction.lines() {
            lines.push(Line::from(Span::styled(
                line.to_string(),
                Style::default().fg(Color::Gray),
            )));
        }
    } else {
        lines.push(Line::from(Span::styled(
            "p: show prompt",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let focused = app.focus == FocusPane::Result;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray }))
        .title(" Analysis Result ");

    let detail = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.result_view.scroll, 0));
    frame.render_widget(detail, detail_area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area, note_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    // Inner size minus borders, for scroll calculations
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let focused = app.focus == FocusPane::Chat;
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray }))
        .title(Line::from(vec![
            Span::styled(" ● ", Style::default().fg(Color::Green)),
            Span::raw(format!("Live Preview: {} Agent ", app.playground.company_name())),
        ]));

    let mut lines: Vec<Line> = Vec::new();
    for msg in &app.playground.messages {
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
            ChatRole::Model => {
                lines.push(Line::from(Span::styled(
                    "Agent:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                for line in msg.content.lines() {
                    lines.push(parse_markdown_line(line));
                }
            }
        }
        lines.push(Line::default());
    }

    if app.playground.is_typing {
        lines.push(Line::from(Span::styled(
            "Agent:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated typing indicator: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("typing{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.playground.scroll, 0));
    frame.render_widget(chat, chat_area);

    // Input, highlighted while editing
    let editing = focused && app.input_mode == InputMode::Editing;
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::DarkGray }))
        .title(if app.playground.can_send() { " Message (Enter to send) " } else { " Message " });

    let inner_width = input_area.width.saturating_sub(2) as usize;
    let cursor_pos = app.playground.cursor.min(app.playground.input.chars().count());
    let scroll_offset = if inner_width > 0 && cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input_text = if app.playground.input.is_empty() {
        Span::styled(
            "Test your agent (e.g., 'What is your pricing?')",
            Style::default().fg(Color::DarkGray),
        )
    } else {
        // Newlines from Shift+Enter are shown as a single glyph to keep cursor math simple
        Span::styled(
            app.playground
                .input
                .chars()
                .map(|c| if c == '\n' { '↵' } else { c })
                .skip(scroll_offset)
                .take(inner_width)
                .collect::<String>(),
            Style::default().fg(Color::Cyan),
        )
    };
    frame.render_widget(Paragraph::new(input_text).block(input_block), input_area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
    }

    let note = Paragraph::new(Span::styled(
        "This playground uses the generated system prompt.",
        Style::default().fg(Color::DarkGray),
    ))
    .alignment(Alignment::Center);
    frame.render_widget(note, note_area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.focus {
        FocusPane::Url => " URL ",
        FocusPane::Result => " RESULT ",
        FocusPane::Chat => " CHAT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = match (app.focus, app.input_mode) {
        (FocusPane::Url, InputMode::Editing) => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" analyze ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        (FocusPane::Chat, InputMode::Editing) => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" S-Enter ", key_style),
            Span::styled(" newline ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        (FocusPane::Result, _) => vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" p ", key_style),
            Span::styled(if app.result_view.show_prompt { " hide prompt " } else { " show prompt " }, label_style),
            Span::styled(" c ", key_style),
            Span::styled(" copy ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
        (FocusPane::Chat, InputMode::Normal) => vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" r ", key_style),
            Span::styled(" reset chat ", label_style),
            Span::styled(" i ", key_style),
            Span::styled(" type ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
        (FocusPane::Url, InputMode::Normal) => vec![
            Span::styled(" i ", key_style),
            Span::styled(" edit ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };
    if app.phase() == WorkflowPhase::Success {
        hints.extend([
            Span::styled(" Tab ", key_style),
            Span::styled(" focus ", label_style),
        ]);
    }

    if let Some(status) = &app.status_message {
        hints.push(Span::styled(
            format!("  {}", status),
            Style::default().bg(Color::Black).fg(Color::LightRed),
        ));
    }

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_bold_is_styled() {
        let line = parse_markdown_line("We offer **free shipping** today");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "free shipping");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_unclosed_bold_is_literal() {
        let line = parse_markdown_line("a **b");
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].content, "a **b");
    }
}
