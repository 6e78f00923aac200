use std::time::Instant;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::session::Phase;

pub fn render(frame: &mut Frame, app: &App, now: Instant) {
    let error = app.session.error_message();
    let error_height = if error.is_empty() { 0 } else { 3 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(error_height),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.size());

    render_title(frame, chunks[0]);
    render_upload(frame, app, chunks[1]);
    if !error.is_empty() {
        render_error(frame, error, chunks[2]);
    }
    render_result(frame, app, chunks[3]);
    render_status_line(frame, app, now, chunks[4]);
}

fn render_title(frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(
            " Excel & CSV Parser ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "open a file to parse and copy the data",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(title), area);
}

fn render_upload(frame: &mut Frame, app: &App, area: Rect) {
    let border_style = if app.session.is_dragging() {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let content = if let Some(buffer) = &app.prompt {
        Line::from(vec![
            Span::styled("Open: ", Style::default().fg(Color::Blue)),
            Span::raw(format!("{}_", buffer)),
        ])
    } else if let Some(path) = &app.pending_drop {
        Line::from(vec![
            Span::styled("Drop ", Style::default().fg(Color::Green)),
            Span::raw(path.display().to_string()),
            Span::styled("  [Enter] load  [Esc] cancel", Style::default().fg(Color::DarkGray)),
        ])
    } else if !app.session.file_name().is_empty() {
        let mut spans = vec![Span::styled(
            app.session.file_name().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )];
        if app.session.is_loading() {
            spans.push(Span::styled("  loading...", Style::default().fg(Color::Yellow)));
        }
        Line::from(spans)
    } else {
        Line::from(Span::styled(
            "[o] choose file, or drag and drop your file here (.csv, .xlsx, .xls)",
            Style::default().fg(Color::DarkGray),
        ))
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title("File");
    frame.render_widget(Paragraph::new(content).block(block), area);
}

fn render_error(frame: &mut Frame, error: &str, area: Rect) {
    let banner = Paragraph::new(error.to_string())
        .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL).title("Error"));
    frame.render_widget(banner, area);
}

fn render_result(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Parsed Data");

    let body = match app.session.phase() {
        Phase::Displaying if app.session.rendered_text().is_empty() => {
            Paragraph::new("(no data)").style(Style::default().fg(Color::DarkGray))
        }
        Phase::Displaying => Paragraph::new(visible_lines(
            app.session.rendered_text(),
            app.scroll as usize,
            area.height.saturating_sub(2) as usize,
        )),
        Phase::Loading { .. } => {
            Paragraph::new("Parsing...").style(Style::default().fg(Color::Yellow))
        }
        Phase::Idle | Phase::Failed => Paragraph::new(""),
    };

    frame.render_widget(body.block(block), area);
}

/// Only the lines that fit the pane, borrowed from the rendered text
fn visible_lines(text: &str, scroll: usize, height: usize) -> Text<'_> {
    Text::from(
        text.lines()
            .skip(scroll)
            .take(height)
            .map(Line::raw)
            .collect::<Vec<_>>(),
    )
}

fn render_status_line(frame: &mut Frame, app: &App, now: Instant, area: Rect) {
    let mut spans = Vec::new();

    if app.session.phase() == Phase::Displaying {
        if app.session.is_copied(now) {
            spans.push(Span::styled(
                " Copied! ",
                Style::default().bg(Color::Green).fg(Color::Black).add_modifier(Modifier::BOLD),
            ));
        } else {
            spans.push(Span::styled(" [c] Copy ", Style::default().bg(Color::Blue).fg(Color::White)));
        }
        spans.push(Span::raw(" "));
        spans.push(Span::styled(" [x] Clear ", Style::default().bg(Color::DarkGray).fg(Color::White)));
        spans.push(Span::raw(" "));
    } else if app.session.phase() == Phase::Failed {
        spans.push(Span::styled(" [x] Clear ", Style::default().bg(Color::DarkGray).fg(Color::White)));
        spans.push(Span::raw(" "));
    }

    spans.push(Span::styled("[o] open  [q] quit", Style::default().fg(Color::DarkGray)));

    if !app.session.notes().is_empty() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            app.session.notes().join("; "),
            Style::default().fg(Color::Cyan),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
