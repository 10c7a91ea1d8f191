use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{BarChart, Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use crate::domain::digest::{DigestItem, RecommendedAction};
use crate::terminal::state::{AppState, NoticeKind, Screen, Section};

pub fn render(f: &mut Frame, state: &AppState) {
    let [header, main, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(f.area());

    render_header(f, header, state);

    let main = if state.show_stats {
        let [left, right] =
            Layout::horizontal([Constraint::Percentage(70), Constraint::Percentage(30)])
                .areas(main);
        render_stats(f, right, state);
        left
    } else {
        main
    };

    match &state.screen {
        Screen::Welcome => render_centered(
            f,
            main,
            vec![
                Line::styled(
                    "Ready to declutter?",
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD),
                ),
                Line::raw(""),
                Line::raw(
                    "Let AI scan your unread emails and separate the important stuff from the noise.",
                ),
                Line::raw(""),
                hint_line(&[("s", "summarize my emails")]),
            ],
        ),
        Screen::Loading => render_centered(
            f,
            main,
            vec![Line::styled(
                "Scanning your inbox...",
                Style::default().fg(Color::Gray),
            )],
        ),
        Screen::CaughtUp(msg) => render_centered(
            f,
            main,
            vec![
                Line::styled(
                    "All Caught Up!",
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                ),
                Line::raw(""),
                Line::raw(msg.clone()),
            ],
        ),
        Screen::Error {
            message,
            unauthorized,
        } => {
            let mut lines = vec![
                Line::styled(message.clone(), Style::default().fg(Color::Red)),
                Line::raw(""),
            ];
            if *unauthorized {
                lines.push(Line::raw(
                    "Press L to sign out, then run `inbox_digest login` to refresh your session.",
                ));
            } else {
                lines.push(hint_line(&[("s", "try again")]));
            }
            render_centered(f, main, lines);
        }
        Screen::Digest => render_digest(f, main, state),
    }

    render_footer(f, footer, state);

    if let Some(confirm) = state.confirm {
        render_popup(
            f,
            " Confirm ",
            Color::Yellow,
            vec![
                Line::raw(confirm.question()),
                Line::raw(""),
                hint_line(&[("y", "yes"), ("n", "no")]),
            ],
        );
    }

    if let Some(notice) = &state.notice {
        let (title, color) = match notice.kind {
            NoticeKind::Info => (" Done ", Color::Green),
            NoticeKind::Error => (" Error ", Color::Red),
        };
        render_popup(
            f,
            title,
            color,
            vec![
                Line::raw(notice.text.clone()),
                Line::raw(""),
                Line::styled("press any key", Style::default().fg(Color::DarkGray)),
            ],
        );
    }
}

fn render_header(f: &mut Frame, area: Rect, state: &AppState) {
    let mut spans = vec![Span::styled(
        " Your Inbox Summary ",
        Style::default()
            .fg(Color::Black)
            .bg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(p) = &state.pending {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(p.busy_text(), Style::default().fg(Color::Yellow)));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_centered(f: &mut Frame, area: Rect, lines: Vec<Line>) {
    let height = lines.len() as u16;
    let [mid] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let p = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(p, mid);
}

fn render_digest(f: &mut Frame, area: Rect, state: &AppState) {
    let briefing = state
        .digest
        .as_ref()
        .and_then(|d| d.global_summary.clone());

    let area = if let Some(text) = briefing {
        let [top, rest] =
            Layout::vertical([Constraint::Length(5), Constraint::Min(0)]).areas(area);
        let p = Paragraph::new(text)
            .block(
                Block::default()
                    .title(" Daily Briefing ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow)),
            )
            .wrap(Wrap { trim: true });
        f.render_widget(p, top);
        rest
    } else {
        area
    };

    let [lists, detail] =
        Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).areas(area);

    let important = state.important();
    let junk = state.junk();

    let [top, bottom] = if junk.is_empty() {
        Layout::vertical([Constraint::Min(0), Constraint::Length(0)]).areas(lists)
    } else {
        Layout::vertical([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(lists)
    };

    if important.is_empty() {
        let p = Paragraph::new("No important emails pending. You're doing great!")
            .block(section_block(
                " Action Needed (0) ",
                Color::Cyan,
                state.section == Section::Important,
            ))
            .wrap(Wrap { trim: true });
        f.render_widget(p, top);
    } else {
        render_section(
            f,
            top,
            state,
            Section::Important,
            &important,
            format!(" Action Needed ({}) ", important.len()),
            Color::Cyan,
        );
    }

    if !junk.is_empty() {
        render_section(
            f,
            bottom,
            state,
            Section::Junk,
            &junk,
            format!(" Junk & Promotions ({}) ", junk.len()),
            Color::Red,
        );
    }

    render_detail(f, detail, state);
}

fn section_block(title: &str, color: Color, focused: bool) -> Block<'static> {
    let border = if focused { Color::Yellow } else { Color::DarkGray };
    Block::default()
        .title(Span::styled(
            title.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
}

fn render_section(
    f: &mut Frame,
    area: Rect,
    state: &AppState,
    section: Section,
    items: &[&DigestItem],
    title: String,
    color: Color,
) {
    let rows: Vec<ListItem> = items
        .iter()
        .map(|e| {
            let subj = Span::styled(
                e.display_subject().to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            );
            let from = Span::styled(
                format!("From: {}", e.display_from()),
                Style::default().fg(Color::Gray),
            );
            ListItem::new(Text::from(vec![Line::from(subj), Line::from(from)]))
        })
        .collect();

    let list = List::new(rows)
        .block(section_block(&title, color, state.section == section))
        .highlight_symbol("➜ ")
        .highlight_style(Style::default().fg(Color::Green));

    f.render_stateful_widget(list, area, &mut state.section_state(section).clone());
}

fn render_detail(f: &mut Frame, area: Rect, state: &AppState) {
    let Some(item) = state.selected_item() else {
        f.render_widget(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
            area,
        );
        return;
    };

    if let Some(editor) = &state.reply {
        let p = Paragraph::new(format!("{}▏", editor.text))
            .block(
                Block::default()
                    .title(format!(" Edit Reply to {} ", item.display_from()))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Green)),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(p, area);
        return;
    }

    if let Some(original) = &state.original {
        let p = Paragraph::new(original.clone())
            .block(
                Block::default()
                    .title(" Original Email ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow)),
            )
            .wrap(Wrap { trim: false })
            .scroll((state.body_scroll, 0));
        f.render_widget(p, area);
        return;
    }

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::styled(item.display_subject().to_string(), bold),
        Line::styled(
            format!("From: {}", item.display_from()),
            Style::default().fg(Color::Gray),
        ),
        Line::raw(""),
        Line::raw(item.summary.clone()),
        Line::raw(""),
    ];

    if let Some(label) = item.recommended_action.label() {
        lines.push(Line::styled(
            "RECOMMENDATION:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
        lines.push(Line::raw(label));
        lines.push(Line::raw(""));
    }

    match item.recommended_action {
        RecommendedAction::Reply => {
            if let Some(draft) = item.draft_reply() {
                lines.push(Line::styled(
                    "Draft Reply:",
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ));
                lines.extend(draft.lines().map(|l| Line::raw(l.to_string())));
                lines.push(Line::raw(""));
            }
            lines.push(hint_line(&[("r", "review & send")]));
        }
        RecommendedAction::Trash => lines.push(hint_line(&[("d", "confirm delete")])),
        _ => lines.push(hint_line(&[("m", "mark as read")])),
    }
    lines.push(hint_line(&[("Enter", "show original email")]));

    let p = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

fn render_stats(f: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default()
        .title(" Your Stats ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let Some(stats) = &state.stats else {
        f.render_widget(Paragraph::new("Loading...").block(block), area);
        return;
    };

    let inner = block.inner(area);
    f.render_widget(block, area);

    let [totals, chart] =
        Layout::vertical([Constraint::Length(4), Constraint::Min(0)]).areas(inner);

    let totals_text = Text::from(vec![
        Line::raw(format!(
            "Time saved: {:.0} min ({:.1} h)",
            stats.total_time_saved_minutes,
            stats.hours_saved()
        )),
        Line::raw(format!("Emails processed: {}", stats.total_emails_processed)),
        Line::raw(format!("Productivity score: {}", stats.productivity_score)),
    ]);
    f.render_widget(Paragraph::new(totals_text), totals);

    // "YYYY-MM-DD" -> "MM-DD"
    let data: Vec<(&str, u64)> = stats
        .graph_data
        .points()
        .map(|(day, minutes)| {
            let label = day.get(5..).unwrap_or(day);
            (label, minutes.max(0.0).round() as u64)
        })
        .collect();

    let bars = BarChart::default()
        .block(Block::default().title("Minutes saved, last 7 days"))
        .bar_width(5)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Magenta))
        .value_style(Style::default().fg(Color::Black).bg(Color::Magenta))
        .data(data.as_slice());
    f.render_widget(bars, chart);
}

fn render_footer(f: &mut Frame, area: Rect, state: &AppState) {
    let hint = if state.reply.is_some() {
        hint_line(&[("Ctrl-S", "send"), ("Esc", "cancel")])
    } else if state.screen == Screen::Digest {
        hint_line(&[
            ("j/k", "move"),
            ("Tab", "section"),
            ("Enter", "original"),
            ("m", "read"),
            ("d", "trash"),
            ("r", "reply"),
            ("A", "all read"),
            ("D", "delete junk"),
            ("s", "refresh"),
            ("t", "stats"),
            ("q", "quit"),
        ])
    } else {
        hint_line(&[
            ("s", "summarize"),
            ("t", "stats"),
            ("L", "logout"),
            ("q", "quit"),
        ])
    };
    f.render_widget(Paragraph::new(hint), area);
}

fn hint_line(pairs: &[(&str, &str)]) -> Line<'static> {
    let mut spans = Vec::with_capacity(pairs.len() * 2);
    for (k, label) in pairs {
        spans.push(Span::styled(
            k.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(format!(" {label}  ")));
    }
    Line::from(spans)
}

fn render_popup(f: &mut Frame, title: &str, color: Color, lines: Vec<Line>) {
    let height = lines.len() as u16 + 2;
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(f.area());
    let [area] = Layout::horizontal([Constraint::Percentage(60)])
        .flex(Flex::Center)
        .areas(row);

    f.render_widget(Clear, area);
    let p = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .title(title.to_string())
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::digest::Digest;
    use crate::domain::stats::{GraphData, UsageStats};
    use crate::terminal::state::Notice;
    use ratatui::{Terminal, backend::TestBackend};

    fn draw(state: &AppState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| render(f, state)).unwrap();
        let buf = terminal.backend().buffer().clone();
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn welcome_screen() {
        let out = draw(&AppState::new());
        assert!(out.contains("Ready to declutter?"));
    }

    #[test]
    fn digest_screen_shows_sections_and_briefing() {
        let mut state = AppState::new();
        state.digest = Some(Digest::new(
            vec![
                DigestItem {
                    id: Some("1".into()),
                    subject: "Deadline".into(),
                    from: "prof@uni.edu".into(),
                    recommended_action: RecommendedAction::Reply,
                    reply_content: "Thanks".into(),
                    ..Default::default()
                },
                DigestItem {
                    id: Some("2".into()),
                    subject: "Sale".into(),
                    recommended_action: RecommendedAction::Trash,
                    ..Default::default()
                },
            ],
            Some("One reply needed.".into()),
        ));
        state.important_state.select(Some(0));
        state.junk_state.select(Some(0));
        state.screen = Screen::Digest;

        let out = draw(&state);
        assert!(out.contains("Daily Briefing"));
        assert!(out.contains("Action Needed (1)"));
        assert!(out.contains("Junk & Promotions (1)"));
        assert!(out.contains("Draft Reply:"));
    }

    #[test]
    fn stats_panel_and_notice() {
        let mut state = AppState::new();
        state.show_stats = true;
        state.stats = Some(UsageStats {
            total_time_saved_minutes: 30.0,
            total_emails_processed: 15,
            graph_data: GraphData {
                x: vec!["2026-10-16".into(), "2026-10-17".into()],
                y: vec![10.0, 20.0],
            },
            productivity_score: 45,
        });
        state.notice = Some(Notice::error("Failed to trash email: boom"));

        let out = draw(&state);
        assert!(out.contains("Productivity score: 45"));
        assert!(out.contains("Failed to trash email: boom"));
    }
}
