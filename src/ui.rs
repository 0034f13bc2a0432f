pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Widget, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::{
    app::{App, MountedGame, SettingsForm},
    games::{content::Rgb, GameKind, GameOption},
    player::PlayerState,
};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

const WATCH_LEGEND: &str =
    "(space) play/pause / (←/→) seek / (x) exercise / (n)ext video / (f)ullscreen / (s)ettings / (q)uit";
const EXERCISE_LEGEND: &str = "(←↑↓→) move / (enter) or (1-9) answer / (esc) stop";
const SETTINGS_LEGEND: &str = "(↑/↓) move / (←/→) change / (space) toggle / (enter) save / (esc)ape";

/// Draws whichever screen matches the app state
pub fn draw(app: &App, f: &mut Frame) {
    screen::current_screen(app.state()).render(app, f);
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn rgb(color: Rgb) -> Color {
    Color::Rgb(color.0, color.1, color.2)
}

pub fn format_clock(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

fn state_label(state: PlayerState) -> &'static str {
    match state {
        PlayerState::Unstarted => "■ loading",
        PlayerState::Playing => "▶ playing",
        PlayerState::Paused => "❚❚ paused",
        PlayerState::Ended => "■ ended",
    }
}

pub(crate) fn render_watching(app: &App, area: Rect, buf: &mut Buffer) {
    let video = app.current_video();
    let player = app.player();
    let position = player.current_time();
    let ratio = if video.duration_seconds > 0.0 {
        (position / video.duration_seconds).clamp(0.0, 1.0)
    } else {
        0.0
    };

    if app.is_fullscreen() {
        // only the picture, no chrome
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Min(1),
            ])
            .split(area);
        Paragraph::new(Span::styled(video.title.clone(), bold()))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Min(1),
            Constraint::Length(1), // progress
            Constraint::Length(1), // clock
            Constraint::Length(1), // countdown
            Constraint::Length(1), // status
            Constraint::Length(1),
            Constraint::Length(2), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled(video.title.clone(), bold()))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    Gauge::default()
        .gauge_style(Style::default().fg(Color::Magenta))
        .ratio(ratio)
        .label("")
        .render(chunks[2], buf);

    Paragraph::new(Line::from(vec![
        Span::styled(
            format!(
                "{} / {}",
                format_clock(position),
                format_clock(video.duration_seconds)
            ),
            bold(),
        ),
        Span::raw("   "),
        Span::styled(state_label(player.state()), dim()),
    ]))
    .alignment(Alignment::Center)
    .render(chunks[3], buf);

    let countdown = if app.controller().is_active() {
        "Exercise time!".to_string()
    } else if app.monitor().watch().is_monitoring {
        format!(
            "Next exercise in {}",
            format_clock(app.monitor().remaining_seconds(position))
        )
    } else {
        "Exercises wait while the video is paused".to_string()
    };
    Paragraph::new(Span::styled(
        countdown,
        Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[4], buf);

    if let Some(status) = app.status() {
        Paragraph::new(Span::styled(status.to_string(), dim()))
            .alignment(Alignment::Center)
            .render(chunks[5], buf);
    }

    let legend_style = Style::default().add_modifier(Modifier::ITALIC);
    Paragraph::new(Span::styled(WATCH_LEGEND, legend_style))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[7], buf);
}

fn option_span(option: &GameOption, number: usize, cursor: bool, selected: bool) -> Span<'static> {
    let mut style = bold();
    if let Some(color) = option.color {
        style = style.fg(rgb(color));
    }
    if selected {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if cursor {
        style = style.add_modifier(Modifier::REVERSED);
    }
    let label = if option.label.is_empty() {
        "██".to_string()
    } else {
        option.label.clone()
    };
    Span::styled(format!(" {number} {label} "), style)
}

fn option_rows(mounted: &MountedGame, answering: bool) -> Vec<Line<'static>> {
    let view = mounted.view();
    view.rows
        .iter()
        .enumerate()
        .map(|(row_idx, row)| {
            let selected = view.selected.get(row_idx).copied().flatten();
            let spans = row
                .iter()
                .enumerate()
                .flat_map(|(idx, option)| {
                    let cursor = answering && row_idx == mounted.row && idx == mounted.column;
                    [
                        option_span(option, idx + 1, cursor, selected == Some(idx)),
                        Span::raw("  "),
                    ]
                })
                .collect::<Vec<_>>();
            Line::from(spans)
        })
        .collect()
}

pub(crate) fn render_exercise(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(session) = app.controller().active() else {
        return;
    };
    let Some(mounted) = app.mounted() else {
        return;
    };
    let kind: GameKind = mounted.kind();
    let view = mounted.view();

    let block = Block::default().borders(Borders::ALL).title(Span::styled(
        format!(
            " {} · {}/{} ",
            kind.title(),
            (session.current_index + 1).min(session.sequence.len()),
            session.sequence.len()
        ),
        bold(),
    ));
    let inner = block.inner(area);
    block.render(area, buf);

    let picture_lines = view.picture.lines().count().max(1) as u16;
    let rows = option_rows(mounted, !session.finishing && mounted.last_outcome.is_none());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(1)
        .constraints([
            Constraint::Length(2), // prompt
            Constraint::Length(picture_lines),
            Constraint::Length(1),
            Constraint::Length(rows.len() as u16 * 2),
            Constraint::Length(1), // feedback
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(inner);

    Paragraph::new(Span::styled(view.prompt.clone(), bold()))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[0], buf);

    let mut picture_style = bold();
    if let Some(accent) = view.accent {
        picture_style = picture_style.fg(rgb(accent));
    }
    Paragraph::new(
        view.picture
            .lines()
            .map(|line| Line::from(Span::styled(line.to_string(), picture_style)))
            .collect::<Vec<_>>(),
    )
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    // blank line between rows
    let spaced: Vec<Line> = rows
        .into_iter()
        .flat_map(|line| [line, Line::raw("")])
        .collect();
    Paragraph::new(spaced)
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    if let Some(outcome) = &mounted.last_outcome {
        let color = if outcome.correct {
            Color::Green
        } else {
            Color::Red
        };
        Paragraph::new(Span::styled(
            outcome.feedback_text.clone(),
            bold().fg(color),
        ))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);
    }

    Paragraph::new(Span::styled(EXERCISE_LEGEND, dim()))
        .alignment(Alignment::Center)
        .render(chunks[6], buf);
}

fn settings_lines(form: &SettingsForm) -> Vec<Line<'static>> {
    let cursor_style = |row: usize| {
        if row == form.cursor {
            bold().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        }
    };

    let mut lines = vec![
        Line::from(Span::styled(
            format!("Games per session      ‹ {:>2} ›", form.game_count),
            cursor_style(0),
        )),
        Line::from(Span::styled(
            format!(
                "Time between breaks    ‹ {} ›",
                format_clock(form.frequency_seconds as f64)
            ),
            cursor_style(1),
        )),
        Line::raw(""),
    ];

    lines.extend(form.games.iter().enumerate().map(|(idx, (kind, enabled))| {
        let mark = if *enabled { "[x]" } else { "[ ]" };
        Line::from(Span::styled(
            format!("{mark} {}", kind.title()),
            cursor_style(SettingsForm::FIXED_ROWS + idx),
        ))
    }));

    lines
}

pub(crate) fn render_settings(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(form) = app.settings() else {
        return;
    };
    let lines = settings_lines(form);
    let width = lines.iter().map(Line::width).max().unwrap_or(0) as u16;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(lines.len() as u16),
            Constraint::Length(1),
        ])
        .split(area);

    Paragraph::new(Span::styled("Settings", bold()))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(width),
            Constraint::Min(0),
        ])
        .split(chunks[1]);
    Paragraph::new(lines).render(body[1], buf);

    let legend_style = Style::default().add_modifier(Modifier::ITALIC);
    let legend = if SETTINGS_LEGEND.width() > chunks[2].width as usize {
        "(enter) save / (esc)ape"
    } else {
        SETTINGS_LEGEND
    };
    Paragraph::new(Span::styled(legend, legend_style))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
}
