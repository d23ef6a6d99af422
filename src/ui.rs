use ratatui::{prelude::*, widgets::*};

use crate::app::upload::{ProcessingStatus, StepStatus};
use crate::dashboard::{KpiCard, TrendChart};
use crate::models::FileStatus;
use crate::toast::ToastKind;

/// Renders a text input field
pub fn render_input<'a>(content: &'a str, title: &'a str, is_focused: bool, masked: bool) -> Paragraph<'a> {
    let style = if is_focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title);

    let text = if masked {
        "•".repeat(content.chars().count())
    } else {
        content.to_string()
    };
    let cursor = if is_focused { "_" } else { "" };
    Paragraph::new(format!("{}{}", text, cursor)).block(block)
}

/// Renders tabs
pub fn render_tabs<'a>(titles: &[&'a str], selected: usize) -> Tabs<'a> {
    let titles: Vec<Line> = titles.iter().map(|t| Line::from(*t)).collect();

    Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(Color::DarkGray))
        .highlight_style(Style::default().fg(Color::Yellow).bold())
        .divider("|")
}

/// Green when the KPI is on the right side of its threshold
pub fn threshold_color(card: &KpiCard) -> Color {
    if card.meets_threshold() {
        Color::Green
    } else {
        Color::Red
    }
}

/// Arrow and color for the change since last period
pub fn change_span(card: &KpiCard) -> Span<'static> {
    let Some(change) = card.change() else {
        return Span::raw("");
    };
    let arrow = if change > 0.0 {
        "▲"
    } else if change < 0.0 {
        "▼"
    } else {
        "="
    };
    let color = match card.improving() {
        Some(true) => Color::Green,
        Some(false) => Color::Red,
        None => Color::DarkGray,
    };
    let text = match card.change_percent() {
        Some(pct) => format!("{} {:+.1} ({:+.1}%)", arrow, change, pct),
        None => format!("{} {:+.1}", arrow, change),
    };
    Span::styled(text, Style::default().fg(color))
}

/// Bar chart of a trend; small-valued series are scaled so decimals show
pub fn trend_bar_chart<'a>(chart: &TrendChart, block: Block<'a>) -> BarChart<'a> {
    let scale = if chart.max_value() <= 10.0 { 10.0 } else { 1.0 };
    let bars: Vec<Bar> = chart
        .points
        .iter()
        .map(|(label, value)| {
            let color = if *value >= chart.threshold {
                Color::Cyan
            } else {
                Color::Blue
            };
            Bar::default()
                .value((value * scale).round() as u64)
                .text_value(format!("{}", value))
                .label(Line::from(label.get(5..).unwrap_or(*label).to_string()))
                .style(Style::default().fg(color))
        })
        .collect();

    BarChart::default()
        .block(block)
        .data(BarGroup::default().bars(&bars))
        .bar_width(5)
        .bar_gap(1)
        .max((chart.max_value() * scale).ceil() as u64)
}

/// File processing status color
pub fn file_status_color(status: &FileStatus) -> Color {
    match status {
        FileStatus::Processed => Color::Green,
        FileStatus::Pending => Color::Yellow,
        FileStatus::Failed => Color::Red,
        FileStatus::Other(_) => Color::Gray,
    }
}

pub fn processing_color(status: ProcessingStatus) -> Color {
    match status {
        ProcessingStatus::Idle => Color::DarkGray,
        ProcessingStatus::Uploading => Color::Blue,
        ProcessingStatus::Parsing => Color::Cyan,
        ProcessingStatus::Calculating => Color::Magenta,
        ProcessingStatus::Complete => Color::Green,
        ProcessingStatus::Failed => Color::Red,
    }
}

pub fn step_style(status: StepStatus) -> Style {
    match status {
        StepStatus::Completed => Style::default().fg(Color::Green),
        StepStatus::Active => Style::default().fg(Color::Yellow).bold(),
        StepStatus::Pending => Style::default().fg(Color::DarkGray),
    }
}

pub fn toast_color(kind: ToastKind) -> Color {
    match kind {
        ToastKind::Info => Color::Cyan,
        ToastKind::Success => Color::Green,
        ToastKind::Error => Color::Red,
    }
}

/// Human readable byte size
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
