//! SecDash TUI - Actor-based security dashboard client
//!
//! Architecture:
//! - UI Layer (Ratatui) - synchronous terminal rendering
//! - App Layer - central state machine processing events
//! - Network Layer (Tokio) - async REST calls and report uploads

use std::io;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::*, symbols::Marker, widgets::*};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use secdash_tui::app::forms::{FieldInput, FormDialog, Picker};
use secdash_tui::app::state::{AdminPane, Modal, SourcesPane};
use secdash_tui::app::upload::{
    ProcessingStatus, StepStatus, ToolCategory, UploadWizard, WizardStep,
};
use secdash_tui::config::{config_dir, AppConfig, Cli};
use secdash_tui::constants::{APP_NAME, APP_VERSION, EMAIL_NOT_VERIFIED_DETAIL};
use secdash_tui::dashboard::{level_dashboard, ChartKind, KpiCard, TargetDirection, TrendChart};
use secdash_tui::messages::ui_events::{key_to_ui_event, Screen, View};
use secdash_tui::messages::{NetworkCommand, NetworkResponse, RenderState, UiEvent};
use secdash_tui::models::KpiLevel;
use secdash_tui::network::upload::PollPolicy;
use secdash_tui::ui::{
    centered_rect, change_span, file_status_color, format_size, processing_color, render_input,
    render_tabs, step_style, threshold_color, toast_color, trend_bar_chart,
};
use secdash_tui::{AppActor, ApiClient, NetworkActor, TokenStore};

/// Terminal cleanup guard
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = AppConfig::load(&cli).context("failed to load configuration")?;

    // Initialize logging to file
    let (log_dir, log_name) = split_log_path(&cfg.log_file);
    let file_appender = tracing_appender::rolling::never(log_dir, log_name);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_new(&cfg.log_filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    tracing::info!(api_url = %cfg.api_url, version = APP_VERSION, "Starting {}", APP_NAME);

    let client = ApiClient::new(&cfg.api_url, cfg.timeout(), TokenStore::open(&config_dir()));

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let _terminal_guard = TerminalGuard;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create channels
    let (ui_tx, ui_rx) = mpsc::unbounded_channel::<UiEvent>();
    let (net_cmd_tx, net_cmd_rx) = mpsc::unbounded_channel::<NetworkCommand>();
    let (net_resp_tx, net_resp_rx) = mpsc::unbounded_channel::<NetworkResponse>();
    let (render_tx, mut render_rx) = mpsc::unbounded_channel::<RenderState>();

    // Spawn network actor
    let network_actor = NetworkActor::new(client, PollPolicy::from(&cfg), net_resp_tx);
    let network = tokio::spawn(network_actor.run(net_cmd_rx));

    // Spawn app actor
    let app_actor = AppActor::new(net_cmd_tx, render_tx, cfg.toast_lifetime());
    tokio::spawn(app_actor.run(ui_rx, net_resp_rx));

    // Run UI loop (synchronous with async polling)
    run_ui_loop(&mut terminal, ui_tx, &mut render_rx).await?;

    // Let the network actor cancel in-flight uploads before exiting
    let _ = tokio::time::timeout(Duration::from_secs(1), network).await;
    tracing::info!("Shut down");

    Ok(())
}

fn split_log_path(path: &Path) -> (&Path, &std::ffi::OsStr) {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let name = path.file_name().unwrap_or(std::ffi::OsStr::new("secdash.log"));
    (dir, name)
}

/// Run the synchronous UI rendering loop
async fn run_ui_loop(
    terminal: &mut Terminal<impl Backend>,
    ui_tx: mpsc::UnboundedSender<UiEvent>,
    render_rx: &mut mpsc::UnboundedReceiver<RenderState>,
) -> anyhow::Result<()> {
    let mut current_state = RenderState::default();

    loop {
        // Draw with current state
        terminal.draw(|f| draw_ui(f, &current_state))?;

        // Poll for events with timeout
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if let Some(event) = key_to_ui_event(key, current_state.ctx) {
                    let quit = matches!(event, UiEvent::Quit);
                    let _ = ui_tx.send(event);
                    if quit {
                        break;
                    }
                }
            }
        }

        // Check for state updates (non-blocking)
        while let Ok(state) = render_rx.try_recv() {
            current_state = state;
        }
    }

    Ok(())
}

// ============================================================================
// UI Drawing Functions
// ============================================================================

fn draw_ui(f: &mut Frame, state: &RenderState) {
    let area = f.area();

    match state.ctx.screen {
        Screen::Starting => {
            let status = if state.user.is_some() {
                "Loading your dashboard..."
            } else {
                "Restoring session..."
            };
            let text = Paragraph::new(format!("{}\n\n{}", APP_NAME, status))
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray));
            f.render_widget(text, centered_rect(40, 20, area));
        }
        Screen::Login => draw_login(f, state, area),
        Screen::Signup => draw_signup(f, state, area),
        Screen::Dashboard => draw_dashboard(f, state, area),
    }

    draw_toasts(f, state, area);
}

fn draw_login(f: &mut Frame, state: &RenderState, area: Rect) {
    let popup = centered_rect(50, 60, area);
    let login = &state.login;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {} - Sign in ", APP_NAME));
    let inner = block.inner(popup);
    f.render_widget(Clear, popup);
    f.render_widget(block, popup);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Email
            Constraint::Length(3), // Password
            Constraint::Min(2),    // Messages
            Constraint::Length(1), // Hints
        ])
        .split(inner);

    f.render_widget(render_input(&login.email, " Email ", login.focus == 0, false), chunks[0]);
    f.render_widget(render_input(&login.password, " Password ", login.focus == 1, true), chunks[1]);

    let mut lines = Vec::new();
    if login.submitting {
        lines.push(Line::styled("Signing in...", Style::default().fg(Color::DarkGray)));
    }
    if login.email_not_verified {
        lines.push(Line::styled(EMAIL_NOT_VERIFIED_DETAIL, Style::default().fg(Color::Yellow)));
        lines.push(Line::styled(
            "Check your inbox for the verification link.",
            Style::default().fg(Color::Yellow),
        ));
    } else if let Some(error) = &login.error {
        lines.push(Line::styled(error.as_str(), Style::default().fg(Color::Red)));
    }
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), chunks[2]);

    let hints = Paragraph::new(" Enter:sign in | Tab:next field | Ctrl+N:create account | Ctrl+C:quit ")
        .style(Style::default().fg(Color::DarkGray));
    f.render_widget(hints, chunks[3]);
}

fn draw_signup(f: &mut Frame, state: &RenderState, area: Rect) {
    let popup = centered_rect(50, 70, area);
    let signup = &state.signup;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(format!(" {} - Create account ", APP_NAME));
    let inner = block.inner(popup);
    f.render_widget(Clear, popup);
    f.render_widget(block, popup);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(inner);

    f.render_widget(render_input(&signup.email, " Email ", signup.focus == 0, false), chunks[0]);
    f.render_widget(render_input(&signup.username, " Username ", signup.focus == 1, false), chunks[1]);
    f.render_widget(render_input(&signup.password, " Password ", signup.focus == 2, true), chunks[2]);

    let message = if signup.submitting {
        Line::styled("Creating account...", Style::default().fg(Color::DarkGray))
    } else if let Some(error) = &signup.error {
        Line::styled(error.as_str(), Style::default().fg(Color::Red))
    } else {
        Line::raw("")
    };
    f.render_widget(Paragraph::new(message).wrap(Wrap { trim: true }), chunks[3]);

    let hints = Paragraph::new(" Enter:sign up | Tab:next field | Esc:back to sign in ")
        .style(Style::default().fg(Color::DarkGray));
    f.render_widget(hints, chunks[4]);
}

fn draw_dashboard(f: &mut Frame, state: &RenderState, area: Rect) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(0),    // Sidebar + content
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    draw_header(f, state, main_chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(18), Constraint::Min(0)])
        .split(main_chunks[1]);

    draw_sidebar(f, state, body[0]);

    let content = body[1];
    match state.ctx.view {
        View::Operational => draw_level(f, KpiLevel::Operational, content),
        View::Managerial => draw_level(f, KpiLevel::Managerial, content),
        View::Strategic => draw_level(f, KpiLevel::Strategic, content),
        View::Sources => draw_sources(f, state, content),
        View::Files => draw_files(f, state, content),
        View::Admin => draw_admin(f, state, content),
    }

    draw_status_bar(f, state, main_chunks[2]);

    match &state.modal {
        Modal::None => {}
        Modal::Help => draw_help_popup(f, area),
        Modal::Upload(wizard) => draw_upload_wizard(f, wizard, area),
        Modal::Form(form) => draw_form(f, form, area),
        Modal::Confirm(confirm) => {
            let popup = centered_rect(50, 20, area);
            let text = vec![
                Line::raw(""),
                Line::raw(confirm.action.question()),
                Line::styled(confirm.subject.as_str(), Style::default().fg(Color::Yellow).bold()),
                Line::raw(""),
                Line::styled("y / Enter: delete    n / Esc: cancel", Style::default().fg(Color::DarkGray)),
            ];
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(" Confirm ")
                .style(Style::default().bg(Color::Black));
            f.render_widget(Clear, popup);
            f.render_widget(
                Paragraph::new(text).block(block).alignment(Alignment::Center),
                popup,
            );
        }
        Modal::Picker(picker) => draw_picker(f, picker, area),
    }
}

fn draw_header(f: &mut Frame, state: &RenderState, area: Rect) {
    let mut spans = vec![
        Span::styled(format!(" {} ", APP_NAME), Style::default().fg(Color::Black).bg(Color::Cyan).bold()),
        Span::raw(" "),
        Span::styled(state.ctx.view.title(), Style::default().fg(Color::White).bold()),
    ];
    if let Some(user) = &state.user {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(user.username.clone(), Style::default().fg(Color::Gray)));
        if let Some(role) = &state.role {
            spans.push(Span::styled(format!(" ({})", role), Style::default().fg(Color::DarkGray)));
        }
        if user.is_superuser {
            spans.push(Span::styled(" [admin]", Style::default().fg(Color::Magenta)));
        }
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_sidebar(f: &mut Frame, state: &RenderState, area: Rect) {
    let items: Vec<ListItem> = state
        .views
        .iter()
        .enumerate()
        .map(|(i, view)| ListItem::new(format!("{} {}", i + 1, view.title())))
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(" Menu "))
        .highlight_style(Style::default().fg(Color::Yellow).bold())
        .highlight_symbol("> ");

    let mut list_state = ListState::default();
    list_state.select(state.views.iter().position(|v| *v == state.ctx.view));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_level(f: &mut Frame, level: KpiLevel, area: Rect) {
    let dash = level_dashboard(level);
    let rows = dash.kpis.len().div_ceil(3);

    let mut constraints: Vec<Constraint> = (0..rows).map(|_| Constraint::Length(7)).collect();
    constraints.push(Constraint::Min(8));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (row, cards) in dash.kpis.chunks(3).enumerate() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 3); 3])
            .split(chunks[row]);
        for (card, col) in cards.iter().zip(cols.iter()) {
            draw_kpi_card(f, card, *col);
        }
    }

    let chart_cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[rows]);
    for (chart, col) in dash.charts.iter().zip(chart_cols.iter()) {
        draw_trend_chart(f, chart, *col);
    }
}

fn draw_kpi_card(f: &mut Frame, card: &KpiCard, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(threshold_color(card)))
        .title(format!(" {} ", card.title));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let comparator = match card.target {
        TargetDirection::Increasing => ">=",
        TargetDirection::Decreasing => "<=",
    };
    let mut lines = vec![
        Line::from(vec![
            Span::styled(format!("{} {}", card.current, card.unit), Style::default().bold()),
            Span::raw("  "),
            change_span(card),
        ]),
        Line::styled(
            format!("threshold {} {}  |  {}", comparator, card.threshold, card.last_calculated),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if !card.top_items.is_empty() {
        let top: Vec<String> = card
            .top_items
            .iter()
            .take(3)
            .map(|item| format!("{} {}", item.name, item.count))
            .collect();
        lines.push(Line::raw(top.join(", ")));
    }
    f.render_widget(Paragraph::new(lines), inner);

    if let Some(progress) = card.progress {
        let gauge_area = Rect {
            y: inner.y + inner.height.saturating_sub(1),
            height: 1.min(inner.height),
            ..inner
        };
        let gauge = LineGauge::default()
            .filled_style(Style::default().fg(threshold_color(card)))
            .ratio((progress / 100.0).clamp(0.0, 1.0));
        f.render_widget(gauge, gauge_area);
    }
}

fn draw_trend_chart(f: &mut Frame, chart: &TrendChart, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} (threshold {}) ", chart.title, chart.threshold));

    match chart.kind {
        ChartKind::Bar => f.render_widget(trend_bar_chart(chart, block), area),
        ChartKind::Line => {
            let points: Vec<(f64, f64)> = chart
                .points
                .iter()
                .enumerate()
                .map(|(i, (_, v))| (i as f64, *v))
                .collect();
            let last = points.len().saturating_sub(1) as f64;
            let threshold = [(0.0, chart.threshold), (last, chart.threshold)];
            let datasets = vec![
                Dataset::default()
                    .marker(Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(Style::default().fg(Color::Cyan))
                    .data(&points),
                Dataset::default()
                    .marker(Marker::Dot)
                    .graph_type(GraphType::Line)
                    .style(Style::default().fg(Color::DarkGray))
                    .data(&threshold),
            ];
            let max = chart.max_value() * 1.1;
            let x_labels: Vec<String> = [chart.points.first(), chart.points.last()]
                .into_iter()
                .flatten()
                .map(|(label, _)| label.to_string())
                .collect();
            let widget = Chart::new(datasets)
                .block(block)
                .x_axis(Axis::default().bounds([0.0, last]).labels(x_labels))
                .y_axis(
                    Axis::default()
                        .bounds([0.0, max])
                        .labels(vec![String::from("0"), format!("{:.0}", max)]),
                );
            f.render_widget(widget, area);
        }
    }
}

fn draw_sources(f: &mut Frame, state: &RenderState, area: Rect) {
    let sources = &state.sources;
    let manage = state.ctx.is_superuser;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    let summary = match &sources.stats {
        Some(stats) => format!(
            " KPIs: {}  |  Tools: {}  |  Logs: {} ({} today)",
            stats.kpis.total, stats.tools.total, stats.logs.total, stats.logs.today
        ),
        None if sources.loading => String::from(" Loading..."),
        None => format!(" KPIs: {}  |  Tools: {}", sources.kpis.len(), sources.tools.len()),
    };
    f.render_widget(Paragraph::new(summary).style(Style::default().fg(Color::Gray)), chunks[0]);

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);

    let filter = sources.level_filter.map_or("all levels", |l| l.title());
    let kpi_items: Vec<ListItem> = sources
        .filtered_kpis()
        .into_iter()
        .map(|k| {
            ListItem::new(Line::from(vec![
                Span::styled(k.name.clone(), Style::default().bold()),
                Span::styled(format!("  [{}]", k.level), Style::default().fg(Color::Cyan)),
                Span::raw(format!(
                    "  target {}{}  {}",
                    k.target,
                    k.unit.as_deref().unwrap_or(""),
                    k.frequency
                )),
            ]))
        })
        .collect();
    draw_pane_list(
        f,
        kpi_items,
        format!(" KPIs ({}) ", filter),
        sources.pane == SourcesPane::Kpis,
        sources.selected_kpi,
        panes[0],
    );

    let tool_items: Vec<ListItem> = sources
        .tools
        .iter()
        .map(|t| {
            ListItem::new(Line::from(vec![
                Span::styled(t.name.clone(), Style::default().bold()),
                Span::styled(format!("  {}", t.summary()), Style::default().fg(Color::Gray)),
                Span::styled(format!("  {}", t.category), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();
    let tools_title = if manage {
        String::from(" Tools ")
    } else {
        String::from(" Tools (read only) ")
    };
    draw_pane_list(
        f,
        tool_items,
        tools_title,
        sources.pane == SourcesPane::Tools,
        sources.selected_tool,
        panes[1],
    );
}

fn draw_pane_list(
    f: &mut Frame,
    items: Vec<ListItem>,
    title: String,
    is_focused: bool,
    selected: usize,
    area: Rect,
) {
    let border_style = if is_focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let highlight_style = if is_focused {
        Style::default().fg(Color::Yellow).bold()
    } else {
        Style::default()
    };
    let empty = items.is_empty();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(title),
        )
        .highlight_style(highlight_style);

    let mut list_state = ListState::default();
    if !empty {
        list_state.select(Some(selected));
    }
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_files(f: &mut Frame, state: &RenderState, area: Rect) {
    let files = &state.files;
    let items: Vec<ListItem> = files
        .files
        .iter()
        .map(|file| {
            let created = file
                .created_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            ListItem::new(Line::from(vec![
                Span::styled(format!("#{:<5}", file.id), Style::default().fg(Color::DarkGray)),
                Span::styled(format!("{:<32}", file.filename), Style::default().bold()),
                Span::raw(format!("{:<10}", file.file_type.as_deref().unwrap_or("-"))),
                Span::raw(format!("{:>10}  ", file.size.map(format_size).unwrap_or_default())),
                Span::styled(
                    format!("{:<10}", file.status.as_str()),
                    Style::default().fg(file_status_color(&file.status)),
                ),
                Span::styled(created, Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    if items.is_empty() {
        let text = if files.loading {
            "Loading files..."
        } else {
            "No files uploaded yet.\n\nPress 'u' to upload a security report."
        };
        let paragraph = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title(" Files "))
            .wrap(Wrap { trim: false });
        f.render_widget(paragraph, area);
        return;
    }

    draw_pane_list(
        f,
        items,
        format!(" Files ({}) ", files.files.len()),
        true,
        files.selected,
        area,
    );
}

fn draw_admin(f: &mut Frame, state: &RenderState, area: Rect) {
    let admin = &state.admin;
    let counts = admin.counts();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let summary = Line::from(vec![
        Span::raw(" Users: "),
        Span::styled(counts.total.to_string(), Style::default().bold()),
        Span::raw("   Administrators: "),
        Span::styled(counts.admins.to_string(), Style::default().fg(Color::Magenta).bold()),
        Span::raw("   Active: "),
        Span::styled(counts.active.to_string(), Style::default().fg(Color::Green).bold()),
        Span::raw("   Verified: "),
        Span::styled(counts.verified.to_string(), Style::default().fg(Color::Cyan).bold()),
    ]);
    let title = if admin.loading { " Admin (loading) " } else { " Admin " };
    f.render_widget(
        Paragraph::new(summary).block(Block::default().borders(Borders::ALL).title(title)),
        chunks[0],
    );

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(chunks[1]);

    let user_items: Vec<ListItem> = admin
        .users
        .iter()
        .map(|u| {
            let mut spans = vec![
                Span::styled(format!("{:<28}", u.email), Style::default().bold()),
                Span::raw(format!("{:<16}", u.username)),
                Span::styled(
                    format!("{:<12}", u.role.as_ref().map_or("-", |r| r.name.as_str())),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(
                    format!("{} perms ", u.permissions.len()),
                    Style::default().fg(Color::DarkGray),
                ),
            ];
            if u.is_superuser {
                spans.push(Span::styled("admin ", Style::default().fg(Color::Magenta)));
            }
            if !u.is_active {
                spans.push(Span::styled("inactive ", Style::default().fg(Color::Red)));
            }
            if !u.is_verified {
                spans.push(Span::styled("unverified", Style::default().fg(Color::Yellow)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();
    draw_pane_list(
        f,
        user_items,
        String::from(" Users "),
        admin.pane == AdminPane::Users,
        admin.selected_user,
        panes[0],
    );

    let role_items: Vec<ListItem> = admin
        .roles
        .iter()
        .map(|r| {
            ListItem::new(Line::from(vec![
                Span::styled(r.name.clone(), Style::default().bold()),
                Span::styled(
                    format!("  {}", r.description.as_deref().unwrap_or("")),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();
    draw_pane_list(
        f,
        role_items,
        format!(" Roles ({} permissions) ", admin.permissions.len()),
        admin.pane == AdminPane::Roles,
        admin.selected_role,
        panes[1],
    );
}

fn draw_status_bar(f: &mut Frame, state: &RenderState, area: Rect) {
    let manage = state.ctx.is_superuser;
    let status = match state.ctx.view {
        View::Sources if manage => {
            " Tab:pane | l:level | n:new | e:edit | d:delete | r:reload | u:upload | ?:help | q:quit "
        }
        View::Sources => " Tab:pane | l:level | r:reload | u:upload | ?:help | q:quit ",
        View::Admin => {
            " Tab:pane | a:role | p:user perms | o:role perms | d:delete | r:reload | ?:help | q:quit "
        }
        View::Files => " j/k:move | r:reload | u:upload | ?:help | q:quit ",
        _ => " 1-6/←→:views | u:upload report | L:logout | ?:help | q:quit ",
    };

    let bar = Paragraph::new(status).style(Style::default().fg(Color::DarkGray));
    f.render_widget(bar, area);
}

fn draw_upload_wizard(f: &mut Frame, wizard: &UploadWizard, area: Rect) {
    let popup = centered_rect(80, 80, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue))
        .title(" Upload Security Report ")
        .style(Style::default().bg(Color::Black));
    let inner = block.inner(popup);
    f.render_widget(Clear, popup);
    f.render_widget(block, popup);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Steps
            Constraint::Min(0),    // Step body
            Constraint::Length(1), // Hints
        ])
        .split(inner);

    let mut steps = Vec::new();
    for step in WizardStep::ALL {
        let status = wizard.step_status(step);
        let marker = match status {
            StepStatus::Completed => "✓".to_string(),
            _ => (step as u8).to_string(),
        };
        steps.push(Span::styled(
            format!(" {} {} ", marker, step.title()),
            step_style(status),
        ));
        if step != WizardStep::Complete {
            steps.push(Span::styled("──", Style::default().fg(Color::DarkGray)));
        }
    }
    let steps = vec![
        Line::from(steps),
        Line::styled(
            format!(" {}", wizard.step.description()),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    f.render_widget(Paragraph::new(steps), chunks[0]);

    let hints = match wizard.step {
        WizardStep::SelectTool => " type:search | Tab:category | ↑↓:move | Enter:select | Esc:close ",
        WizardStep::SelectFile => " type:file path | Enter:upload | Shift+Tab:back | Esc:close ",
        WizardStep::Processing if wizard.status == ProcessingStatus::Failed => {
            " F5/Enter:try again | Shift+Tab:start over | Esc:close "
        }
        WizardStep::Processing => " Esc:cancel upload ",
        WizardStep::Complete => " Enter/Esc:close ",
    };
    f.render_widget(
        Paragraph::new(hints).style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );

    let body = chunks[1];
    match wizard.step {
        WizardStep::SelectTool => draw_wizard_tools(f, wizard, body),
        WizardStep::SelectFile => draw_wizard_file(f, wizard, body),
        WizardStep::Processing => draw_wizard_processing(f, wizard, body),
        WizardStep::Complete => {
            let mut lines = vec![
                Line::raw(""),
                Line::styled("Processing Complete!", Style::default().fg(Color::Green).bold()),
                Line::raw(ProcessingStatus::Complete.message()),
                Line::raw(""),
            ];
            if let Some(file) = &wizard.result {
                lines.push(Line::styled(
                    format!("{} (#{}) is {}", file.filename, file.id, file.status.as_str()),
                    Style::default().fg(Color::Gray),
                ));
            }
            f.render_widget(
                Paragraph::new(lines).alignment(Alignment::Center),
                body,
            );
        }
    }
}

fn draw_wizard_tools(f: &mut Frame, wizard: &UploadWizard, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    f.render_widget(render_input(&wizard.search, " Search tools ", true, false), chunks[0]);

    let labels: Vec<String> = ToolCategory::ALL
        .iter()
        .map(|c| format!("{} ({})", c.label(), wizard.category_count(*c)))
        .collect();
    let label_refs: Vec<&str> = labels.iter().map(String::as_str).collect();
    let selected = ToolCategory::ALL
        .iter()
        .position(|c| *c == wizard.category)
        .unwrap_or(0);
    f.render_widget(render_tabs(&label_refs, selected), chunks[1]);

    if wizard.tools_loading {
        f.render_widget(
            Paragraph::new("Loading tools...").style(Style::default().fg(Color::DarkGray)),
            chunks[2],
        );
        return;
    }

    let tools = wizard.filtered_tools();
    if tools.is_empty() {
        f.render_widget(
            Paragraph::new("No tools match your search.").style(Style::default().fg(Color::DarkGray)),
            chunks[2],
        );
        return;
    }
    let items: Vec<ListItem> = tools
        .iter()
        .map(|t| {
            ListItem::new(Line::from(vec![
                Span::styled(t.name.clone(), Style::default().bold()),
                Span::styled(format!("  {}", t.summary()), Style::default().fg(Color::Gray)),
            ]))
        })
        .collect();
    draw_pane_list(f, items, String::from(" Tools "), true, wizard.highlighted, chunks[2]);
}

fn draw_wizard_file(f: &mut Frame, wizard: &UploadWizard, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let tool = wizard
        .tool
        .as_ref()
        .map_or(String::from("-"), |t| format!("{} ({})", t.name, t.summary()));
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::raw(" Tool: "),
            Span::styled(tool, Style::default().fg(Color::Cyan).bold()),
        ])),
        chunks[0],
    );

    f.render_widget(
        render_input(&wizard.file_path, " Report file path ", true, false),
        chunks[1],
    );

    let note = if wizard.can_submit() {
        Line::styled("Press Enter to upload and process", Style::default().fg(Color::Green))
    } else {
        Line::styled("Enter the path of a report file to continue", Style::default().fg(Color::DarkGray))
    };
    f.render_widget(Paragraph::new(note), chunks[2]);
}

fn draw_wizard_processing(f: &mut Frame, wizard: &UploadWizard, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let color = processing_color(wizard.status);
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" Upload "))
        .gauge_style(Style::default().fg(color))
        .percent(u16::from(wizard.progress.min(100)))
        .label(format!("{}%", wizard.progress));
    f.render_widget(gauge, chunks[1]);

    let mut lines = vec![Line::styled(wizard.status.message(), Style::default().fg(color).bold())];
    if let Some(error) = &wizard.error {
        lines.push(Line::raw(""));
        lines.push(Line::styled(error.as_str(), Style::default().fg(Color::Red)));
    }
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), chunks[2]);
}

fn draw_form(f: &mut Frame, form: &FormDialog, area: Rect) {
    let popup = centered_rect(60, 90, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(form.title())
        .style(Style::default().bg(Color::Black));
    let inner = block.inner(popup);
    f.render_widget(Clear, popup);
    f.render_widget(block, popup);

    let mut constraints: Vec<Constraint> = form.fields.iter().map(|_| Constraint::Length(3)).collect();
    constraints.push(Constraint::Min(1));
    constraints.push(Constraint::Length(1));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    for (i, field) in form.fields.iter().enumerate() {
        let title = match (field.input, field.required) {
            (FieldInput::Choice(_), _) => format!(" {} * (space to change) ", field.label),
            (FieldInput::Text, true) => format!(" {} * ", field.label),
            (FieldInput::Text, false) => format!(" {} ", field.label),
        };
        f.render_widget(render_input(&field.value, &title, form.focus == i, false), chunks[i]);
    }

    let n = form.fields.len();
    let message = if form.saving {
        Line::styled("Saving...", Style::default().fg(Color::DarkGray))
    } else if let Some(error) = &form.error {
        Line::styled(error.as_str(), Style::default().fg(Color::Red))
    } else {
        Line::raw("")
    };
    f.render_widget(Paragraph::new(message).wrap(Wrap { trim: true }), chunks[n]);
    f.render_widget(
        Paragraph::new(" Enter:save | Tab/↑↓:field | Esc:cancel ").style(Style::default().fg(Color::DarkGray)),
        chunks[n + 1],
    );
}

fn draw_picker(f: &mut Frame, picker: &Picker, area: Rect) {
    let popup = centered_rect(50, 60, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(picker.title.as_str())
        .title_bottom(Line::from(" Space/Enter:toggle | Esc:close ").right_aligned())
        .style(Style::default().bg(Color::Black));

    if picker.loading {
        f.render_widget(Paragraph::new("Loading...").block(block), popup);
        return;
    }

    let items: Vec<ListItem> = picker
        .items
        .iter()
        .map(|item| {
            let mark = if item.checked { "[x]" } else { "[ ]" };
            let style = if item.checked {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };
            ListItem::new(format!("{} {}", mark, item.label)).style(style)
        })
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().fg(Color::Yellow).bold());
    let mut list_state = ListState::default();
    list_state.select(Some(picker.selected));
    f.render_stateful_widget(list, popup, &mut list_state);
}

fn draw_toasts(f: &mut Frame, state: &RenderState, area: Rect) {
    let width = 44.min(area.width);
    let mut y = area.height.saturating_sub(1);
    for (kind, message) in state.toasts.iter().rev() {
        if y < 3 {
            break;
        }
        y -= 3;
        let rect = Rect {
            x: area.width.saturating_sub(width),
            y,
            width,
            height: 3,
        };
        let color = toast_color(*kind);
        let toast = Paragraph::new(message.as_str())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color)),
            )
            .style(Style::default().fg(color).bg(Color::Black));
        f.render_widget(Clear, rect);
        f.render_widget(toast, rect);
    }
}

fn draw_help_popup(f: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 80, area);

    let help_text = r#"
 SECDASH - Keyboard Shortcuts

 NAVIGATION
   1-6 / ← →          Switch view
   ↑ / ↓ (j / k)      Move selection
   Tab                Switch pane (Sources, Admin)
   r                  Reload current view

 REPORTS
   u                  Upload a security report
                      Tab: category  Enter: next  Shift+Tab: back
                      F5: try again  Esc: close / cancel

 SOURCES (administrators)
   l                  Cycle KPI level filter
   n / e / d          New, edit, delete KPI or tool

 ADMIN
   a                  Assign role to user
   p                  Edit user permissions
   o                  Edit role permissions
   d                  Delete user

 GENERAL
   ?                  Toggle this help
   L                  Log out
   q / Ctrl+C         Quit

 Press any key to close...
"#;

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Help ")
        .style(Style::default().bg(Color::Black));

    let help = Paragraph::new(help_text)
        .block(block)
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, popup_area);
    f.render_widget(help, popup_area);
}
