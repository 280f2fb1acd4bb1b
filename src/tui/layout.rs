//! TUI layout and widget rendering.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, Gauge, Paragraph};

use super::runtime::App;
use super::style;
use crate::core::CoreSnapshot;
use crate::diagnostics::SubsystemKind;

/// Renders the full dashboard frame.
pub fn render(frame: &mut Frame, app: &App) {
    let snapshot = app.snapshot();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(10),   // chart + alerts
            Constraint::Length(3), // gauges
            Constraint::Length(12), // diagnostics, policy, economics
            Constraint::Length(1), // footer
        ])
        .split(frame.area());

    render_header(frame, app, &snapshot, chunks[0]);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);
    render_chart(frame, app, middle[0]);
    render_alerts(frame, &snapshot, middle[1]);

    render_gauges(frame, &snapshot, chunks[2]);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(34),
            Constraint::Percentage(36),
            Constraint::Percentage(30),
        ])
        .split(chunks[3]);
    render_diagnostics(frame, &snapshot, panels[0]);
    render_policy(frame, &snapshot, panels[1]);
    render_economics(frame, &snapshot, panels[2]);

    render_footer(frame, app, chunks[4]);
}

/// Header bar: preset, mode, streaming state, tick count, speed.
fn render_header(frame: &mut Frame, app: &App, snapshot: &CoreSnapshot, area: Rect) {
    let emergency = snapshot.mode.is_emergency();
    let (icon, label) = if emergency {
        ("■", "EMERGENCY")
    } else if snapshot.streaming {
        ("▶", "STREAMING")
    } else {
        ("‖", "PAUSED")
    };
    let bg = if emergency && app.flash % 2 == 1 {
        style::EMERGENCY_BG
    } else {
        style::HEADER_BG
    };

    let header = Line::from(vec![
        Span::styled(
            " SMART-EMS ",
            Style::default()
                .fg(style::HEADER_FG)
                .bg(bg)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(
            &app.preset_name,
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            " │ tick {} │ {}ms │ {} {} │ objective {} ",
            snapshot.ticks,
            app.tick_interval_ms(),
            icon,
            label,
            snapshot.objective,
        )),
    ]);
    frame.render_widget(Paragraph::new(header), area);
}

/// Solar output vs grid load over the retained history.
fn render_chart(frame: &mut Frame, app: &App, area: Rect) {
    let solar: Vec<(f64, f64)> = app
        .history
        .iter()
        .map(|r| (r.tick as f64, r.reading.renewables.solar.output))
        .collect();
    let load: Vec<(f64, f64)> = app
        .history
        .iter()
        .map(|r| (r.tick as f64, r.reading.grid.load))
        .collect();

    let y_bounds = style::auto_bounds_y(&solar, &load);
    let x_lo = solar.first().map_or(0.0, |p| p.0);
    let x_hi = solar.last().map_or(1.0, |p| p.0).max(x_lo + 1.0);

    let datasets = vec![
        Dataset::default()
            .name("Solar")
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(style::SOLAR_COLOR))
            .data(&solar),
        Dataset::default()
            .name("Load")
            .marker(symbols::Marker::Dot)
            .style(Style::default().fg(style::LOAD_COLOR))
            .data(&load),
    ];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title(" Solar Output vs Grid Load ")
                .borders(Borders::ALL),
        )
        .x_axis(
            Axis::default()
                .title("tick")
                .bounds([x_lo, x_hi])
                .labels(vec![format!("{}", x_lo as u64), format!("{}", x_hi as u64)]),
        )
        .y_axis(
            Axis::default()
                .title("kW")
                .bounds(y_bounds)
                .labels(vec![
                    format!("{:.1}", y_bounds[0]),
                    format!("{:.1}", y_bounds[1]),
                ]),
        );

    frame.render_widget(chart, area);
}

/// Active alerts, newest first.
fn render_alerts(frame: &mut Frame, snapshot: &CoreSnapshot, area: Rect) {
    let lines: Vec<Line> = if snapshot.active_alerts.is_empty() {
        vec![Line::from("  No active alerts")]
    } else {
        snapshot
            .active_alerts
            .iter()
            .rev()
            .map(|alert| {
                Line::from(vec![
                    Span::styled(
                        format!(" {:<8} ", alert.severity.to_string().to_uppercase()),
                        Style::default()
                            .fg(style::severity_color(alert.severity))
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(alert.message.clone()),
                ])
            })
            .collect()
    };

    let title = format!(
        " Alerts ({} active / {} total) ",
        snapshot.active_alerts.len(),
        snapshot.alert_history_len
    );
    let paragraph = Paragraph::new(lines).block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

/// SOC plus the four health indices.
fn render_gauges(frame: &mut Frame, snapshot: &CoreSnapshot, area: Rect) {
    let indices = snapshot.health_indices;
    let gauges = [
        ("SOC", snapshot.reading.battery.state_of_charge),
        ("Renewable", indices.renewable),
        ("BMS", indices.bms),
        ("EV", indices.ev),
        ("Safety", indices.safety),
    ];
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 5); 5])
        .split(area);

    for ((title, value), chunk) in gauges.into_iter().zip(chunks.iter()) {
        let gauge = Gauge::default()
            .block(Block::default().title(format!(" {title} ")).borders(Borders::ALL))
            .gauge_style(Style::default().fg(style::level_color(value)))
            .ratio((value / 100.0).clamp(0.0, 1.0))
            .label(format!("{value:.0}%"));
        frame.render_widget(gauge, *chunk);
    }
}

/// Per-subsystem health levels and the cell voltage strip.
fn render_diagnostics(frame: &mut Frame, snapshot: &CoreSnapshot, area: Rect) {
    let mut lines: Vec<Line> = [
        SubsystemKind::Battery,
        SubsystemKind::Renewable,
        SubsystemKind::EvCharger,
        SubsystemKind::Safety,
    ]
    .into_iter()
    .filter_map(|kind| snapshot.verdict(kind))
    .map(|verdict| {
        Line::from(vec![
            Span::raw(format!("  {:<10}", verdict.subsystem.as_str())),
            Span::styled(
                verdict.health.as_str(),
                Style::default().fg(style::health_color(verdict.health)),
            ),
        ])
    })
    .collect();

    let mut cells = vec![Span::raw("  cells     ")];
    cells.extend(
        snapshot
            .cell_statuses
            .iter()
            .map(|status| Span::styled("▮", Style::default().fg(style::cell_color(*status)))),
    );
    lines.push(Line::from(cells));

    let paragraph =
        Paragraph::new(lines).block(Block::default().title(" Diagnostics ").borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

/// Current recommendation, bucket and training progress.
fn render_policy(frame: &mut Frame, snapshot: &CoreSnapshot, area: Rect) {
    let mut lines = match &snapshot.recommendation {
        Some(rec) => vec![
            Line::from(Span::styled(
                format!("  {}", rec.action),
                Style::default()
                    .fg(style::POLICY_COLOR)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("  confidence {:.0}%", rec.confidence * 100.0)),
            Line::from(format!("  state {}", rec.key)),
        ],
        None => vec![Line::from("  Waiting for first reading...")],
    };
    let training = snapshot.training;
    lines.push(Line::from(format!(
        "  episodes {}  convergence {:.1}%",
        training.episodes, training.convergence
    )));
    lines.push(Line::from(format!(
        "  exploration {:.2}",
        training.exploration_rate
    )));

    let paragraph =
        Paragraph::new(lines).block(Block::default().title(" Policy ").borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

/// Economics counters and the pattern-learning gauges.
fn render_economics(frame: &mut Frame, snapshot: &CoreSnapshot, area: Rect) {
    let e = snapshot.economics;
    let mut lines = vec![
        Line::from(format!("  savings   ${:>6.1}/h", e.cost_savings)),
        Line::from(format!("  V2G       ${:>6.1}/h", e.v2g_revenue)),
        Line::from(format!("  renewable  {:>6.1}%", e.renewable_usage)),
        Line::from(format!("  total     ${:>6.1}", e.total_savings)),
        Line::from(format!("  carbon     {:>6.1} kg", e.carbon_saved)),
        Line::from(format!("  patterns   {:>6}", e.patterns_identified)),
    ];
    let learning = snapshot.learning;
    for (label, value) in [
        ("temp", learning.temperature_patterns),
        ("occupancy", learning.occupancy_learning),
        ("energy", learning.energy_correlation),
        ("predict", learning.predictive_accuracy),
    ] {
        lines.push(Line::from(Span::styled(
            format!("  {label:<9} {value:>6.1}%"),
            Style::default().fg(style::POLICY_COLOR),
        )));
    }
    let paragraph =
        Paragraph::new(lines).block(Block::default().title(" Economics ").borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

/// Footer with keybinding hints, or the last control outcome.
fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let hints = " q:Quit  Space:Stream  e:Emergency  f:Fault  o:Objective  a:Ack  +/-:Speed  1/2/3:Preset  r:Restart";
    let text = match &app.status {
        Some(status) => format!("{hints}  │ {status}"),
        None => hints.to_string(),
    };
    let footer = Paragraph::new(Line::from(Span::styled(
        text,
        Style::default().fg(style::FOOTER_FG),
    )));
    frame.render_widget(footer, area);
}
