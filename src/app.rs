use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, LineGauge, Paragraph, Row, Table},
    Frame, Terminal,
};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use wxzones::openmeteo::WeatherSource;
use wxzones::playback::{PlaybackSpeed, Ticker};
use wxzones::rules::{self, Classification};
use wxzones::units::{self, Units};
use wxzones::weather::{Field, Quality};
use wxzones::workspace::{Workspace, Zone};
use wxzones::{
    Coordinate, Observation, PlaybackController, TimeAxis, TimeSelector, TimeWindow, WeatherResolver,
};

const MISSING: &str = "--";

/// Longest the loop waits for input before checking results and the timer.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Identifies what a resolution was started for.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestKey {
    pub zone_id: String,
    pub coordinate: Coordinate,
    pub window: TimeWindow,
}

#[derive(Debug)]
struct Resolved {
    key: RequestKey,
    observation: Observation,
}

#[derive(Debug, Default)]
struct ZoneState {
    pending: Option<RequestKey>,
    observation: Option<Observation>,
}

/// One zone as shown to the user.
pub struct ZoneLine {
    pub name: String,
    pub centroid: Option<Coordinate>,
    pub value: String,
    pub color: String,
    pub status: &'static str,
}

pub struct App<S> {
    workspace: Workspace,
    axis: TimeAxis,
    playback: PlaybackController,
    ticker: Ticker,
    units: Units,
    resolver: Arc<WeatherResolver<S>>,
    runtime: Handle,
    results_tx: UnboundedSender<Resolved>,
    results_rx: UnboundedReceiver<Resolved>,
    zones: HashMap<String, ZoneState>,
}

impl<S: WeatherSource + 'static> App<S> {
    pub fn new(
        workspace: Workspace,
        axis: TimeAxis,
        resolver: Arc<WeatherResolver<S>>,
        runtime: Handle,
    ) -> Self {
        let playback = PlaybackController::new(axis.max_index(), axis.reference_index());
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            workspace,
            axis,
            playback,
            ticker: Ticker::default(),
            units: Units::default(),
            resolver,
            runtime,
            results_tx,
            results_rx,
            zones: HashMap::new(),
        }
    }

    fn window(&self) -> TimeWindow {
        self.axis.window(&self.playback.selector())
    }

    /// Starts a resolution for every zone whose shown data is not for the current window.
    pub fn refresh(&mut self) {
        let window = self.window();
        for zone in &self.workspace.polygons {
            let Some(coordinate) = zone.centroid() else {
                continue;
            };
            let key = RequestKey {
                zone_id: zone.id.clone(),
                coordinate,
                window,
            };
            let state = self.zones.entry(zone.id.clone()).or_default();
            let current = state
                .observation
                .as_ref()
                .is_some_and(|obs| obs.answers(coordinate, window));
            if current {
                state.pending = None;
                continue;
            }
            if state.pending.as_ref() == Some(&key) {
                continue;
            }
            state.pending = Some(key.clone());

            let resolver = Arc::clone(&self.resolver);
            let tx = self.results_tx.clone();
            self.runtime.spawn(async move {
                let observation = resolver.resolve(key.coordinate, key.window).await;
                // the receiver only goes away when the app shuts down
                let _ = tx.send(Resolved { key, observation });
            });
        }
    }

    fn apply(&mut self, resolved: Resolved) {
        let Resolved { key, observation } = resolved;
        if key.window != self.window() {
            tracing::debug!(zone = %key.zone_id, "dropping result for another window");
            return;
        }
        let Some(state) = self.zones.get_mut(&key.zone_id) else {
            tracing::debug!(zone = %key.zone_id, "dropping result for deleted zone");
            return;
        };
        if state.pending.as_ref() != Some(&key) || !observation.answers(key.coordinate, key.window) {
            tracing::debug!(zone = %key.zone_id, "dropping stale result");
            return;
        }
        state.pending = None;
        state.observation = Some(observation);
    }

    fn drain_results(&mut self) {
        while let Ok(resolved) = self.results_rx.try_recv() {
            self.apply(resolved);
        }
    }

    fn has_pending(&self) -> bool {
        self.zones.values().any(|z| z.pending.is_some())
    }

    /// Resolves the current window for every zone and waits for all results.
    pub async fn settle(&mut self) {
        self.refresh();
        while self.has_pending() {
            match self.results_rx.recv().await {
                Some(resolved) => self.apply(resolved),
                None => break,
            }
        }
    }

    /// Handles a key press; returns `false` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        let now = Instant::now();
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Char(' ') => {
                self.playback.toggle();
                if self.playback.is_playing() {
                    self.ticker.start(now, self.playback.speed().interval());
                } else {
                    self.ticker.stop();
                }
            }
            KeyCode::Char('r') => {
                let range = !self.playback.selector().is_range();
                self.playback.set_mode(range);
                self.refresh();
            }
            KeyCode::Char('n') => {
                self.playback.jump_to_reference();
                self.refresh();
            }
            KeyCode::Char(c @ '1'..='4') => {
                let speed = PlaybackSpeed::all()[c as usize - '1' as usize];
                self.playback.set_speed(speed);
                self.ticker.retime(now, speed.interval());
            }
            KeyCode::Left => {
                self.playback.step(-1);
                self.refresh();
            }
            KeyCode::Right => {
                self.playback.step(1);
                self.refresh();
            }
            KeyCode::Char('u') => self.units = self.units.toggled(),
            _ => {}
        }
        true
    }

    fn on_timer(&mut self) {
        if self.ticker.due(Instant::now()) && self.playback.tick() {
            self.refresh();
        }
    }

    pub fn zone_line(&self, zone: &Zone) -> ZoneLine {
        let centroid = zone.centroid();
        let state = self.zones.get(&zone.id);
        let observation = state.and_then(|s| s.observation.as_ref());
        let rule_set = self.workspace.rules_for(zone);

        let value = match (observation, rule_set) {
            (Some(obs), Some(set)) => Field::from_key(&set.field)
                .and_then(|field| obs.value(field).map(|v| units::format_value(field, v, self.units)))
                .unwrap_or_else(|| MISSING.to_string()),
            _ => MISSING.to_string(),
        };
        let color = match (observation, rule_set) {
            (Some(obs), Some(set)) => rules::classify(obs, set),
            (Some(_), None) => Classification::NoData.color(),
            (None, _) => rules::NO_DATA_COLOR,
        };
        let status = match (centroid, state, observation) {
            (None, _, _) => "no shape",
            (_, Some(s), _) if s.pending.is_some() => "loading",
            (_, _, Some(obs)) => match obs.quality {
                Quality::Remote => "archive",
                Quality::Patched => "patched",
                Quality::Fallback => "fallback",
            },
            _ => MISSING,
        };

        ZoneLine {
            name: zone.name.clone(),
            centroid,
            value,
            color: color.to_string(),
            status,
        }
    }

    /// Label of the classified field when every zone classifies the same one.
    pub fn value_heading(&self) -> &'static str {
        let mut fields = self
            .workspace
            .polygons
            .iter()
            .filter_map(|zone| self.workspace.rules_for(zone))
            .filter_map(|set| Field::from_key(&set.field));
        match fields.next() {
            Some(first) if fields.all(|f| f == first) => first.label(),
            _ => "Value",
        }
    }

    pub fn lines(&self) -> Vec<ZoneLine> {
        self.workspace
            .polygons
            .iter()
            .map(|zone| self.zone_line(zone))
            .collect()
    }

    pub fn selected_time_text(&self) -> String {
        match self.window() {
            TimeWindow::At(ts) => format_time(ts),
            TimeWindow::Between(start, end) => {
                format!("{} to {}", format_time(start), format_time(end))
            }
        }
    }
}

fn format_time(ts: NaiveDateTime) -> String {
    ts.format("%-d %B %Y, %I:%M %p").to_string()
}

/// `#rrggbb` to a terminal color; anything else renders gray.
fn hex_color(hex: &str) -> Color {
    let channel = |i: usize| {
        hex.get(i..i + 2)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
    };
    match (hex.len(), hex.starts_with('#'), channel(1), channel(3), channel(5)) {
        (7, true, Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => Color::Gray,
    }
}

pub fn run_app<B: Backend, S: WeatherSource + 'static>(
    terminal: &mut Terminal<B>,
    mut app: App<S>,
) -> io::Result<()> {
    app.refresh();
    loop {
        app.drain_results();
        terminal.draw(|f| ui(f, &app))?;

        let wait = app
            .ticker
            .remaining(Instant::now())
            .map_or(IDLE_POLL, |left| left.min(IDLE_POLL));
        if event::poll(wait)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && !app.handle_key(key.code) {
                    return Ok(());
                }
            }
        }

        app.on_timer();
    }
}

fn panel(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(Color::Yellow),
        ))
        .title_alignment(Alignment::Left)
        .border_style(Style::default().fg(Color::Cyan))
        .border_type(BorderType::Rounded)
}

fn display_headline<S: WeatherSource + 'static>(app: &App<S>) -> Paragraph<'_> {
    let mode = if app.playback.selector().is_range() {
        "Time Range"
    } else {
        "Single Time"
    };
    let state = if app.playback.is_playing() {
        "playing"
    } else {
        "paused"
    };
    Paragraph::new(vec![
        Line::from(vec![
            Span::raw(" "),
            Span::styled(
                app.selected_time_text(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::raw(" "),
            Span::styled(mode, Style::default().fg(Color::Blue)),
            Span::raw(" : "),
            Span::styled(state, Style::default().fg(Color::Green)),
            Span::raw(format!(
                " {}  ({} units)",
                app.playback.speed().label(),
                app.units.label()
            )),
        ]),
    ])
    .block(panel("wxzones"))
}

fn display_zones<S: WeatherSource + 'static>(app: &App<S>) -> Table<'_> {
    let header = Row::new(vec!["Zone", "Centroid", app.value_heading(), "Color", "Source"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let rows = app.lines().into_iter().map(|line| {
        let centroid = line
            .centroid
            .map_or_else(|| MISSING.to_string(), |c| c.to_string());
        Row::new(vec![
            Cell::from(format!(" {}", line.name)),
            Cell::from(centroid),
            Cell::from(line.value).style(Style::default().fg(Color::Green)),
            Cell::from("████").style(Style::default().fg(hex_color(&line.color))),
            Cell::from(line.status),
        ])
    });

    Table::new(
        rows,
        [
            Constraint::Percentage(30),
            Constraint::Length(20),
            Constraint::Length(14),
            Constraint::Length(6),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(panel("Zones"))
}

fn display_scrubber<S: WeatherSource + 'static>(app: &App<S>) -> LineGauge<'_> {
    let max = app.axis.max_index().max(1) as f64;
    let (position, label) = match app.playback.selector() {
        TimeSelector::Point(i) => (i, format!("{i}/{}", app.axis.max_index())),
        TimeSelector::Range { start, end } => {
            (end, format!("{start}-{end}/{}", app.axis.max_index()))
        }
    };
    LineGauge::default()
        .block(panel("Timeline"))
        .filled_style(Style::default().fg(Color::Cyan))
        .line_set(symbols::line::THICK)
        .label(label)
        .ratio((position as f64 / max).clamp(0.0, 1.0))
}

fn ui<S: WeatherSource + 'static>(f: &mut Frame, app: &App<S>) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(5),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    f.render_widget(display_headline(app), layout[0]);
    f.render_widget(display_zones(app), layout[1]);
    f.render_widget(display_scrubber(app), layout[2]);
    f.render_widget(
        Paragraph::new(
            " space play/pause  r range  n now  1-4 speed  ←/→ step  u units  q quit",
        )
        .style(Style::default().fg(Color::DarkGray)),
        layout[3],
    );
}
