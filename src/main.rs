use std::fs::OpenOptions;
use std::io;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wxzones::cache::WeatherCache;
use wxzones::config::{LogSettings, Settings};
use wxzones::openmeteo::{Offline, OpenMeteo, WeatherSource};
use wxzones::workspace::Workspace;
use wxzones::{TimeAxis, WeatherResolver};

mod app;
mod cli;

use crate::app::{run_app, App};
use crate::cli::Args;

/// Logs go to a file; the terminal belongs to the UI.
fn init_tracing(log: &LogSettings) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log.file)
        .with_context(|| format!("opening log file {}", log.file))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| log.filter.as_str().into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();
    Ok(())
}

fn print_table<S: WeatherSource + 'static>(app: &App<S>) {
    println!("{}", app.selected_time_text());
    for line in app.lines() {
        let centroid = line
            .centroid
            .map_or_else(|| "--".to_string(), |c| c.to_string());
        println!(
            "{:<24} {:<20} {:>12} {} {}",
            line.name, centroid, line.value, line.color, line.status
        );
    }
}

fn launch<S: WeatherSource + 'static>(
    args: &Args,
    runtime: &Runtime,
    resolver: WeatherResolver<S>,
    workspace: Workspace,
    axis: TimeAxis,
) -> anyhow::Result<()> {
    let mut app = App::new(workspace, axis, Arc::new(resolver), runtime.handle().clone());

    if args.once {
        runtime.block_on(app.settle());
        print_table(&app);
        return Ok(());
    }

    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res.context("terminal UI failed")
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref()).context("loading configuration")?;
    init_tracing(&settings.log)?;

    let workspace = Workspace::load(&args.workspace)
        .with_context(|| format!("loading workspace {}", args.workspace.display()))?;
    let reference = args.at.unwrap_or_else(|| Local::now().naive_local());
    let axis = TimeAxis::build_with(reference, settings.timeline.axis_spec());
    tracing::info!(
        %reference,
        zones = workspace.polygons.len(),
        steps = axis.len(),
        "starting"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let cache = Arc::new(WeatherCache::new(
        settings.cache.ttl(),
        settings.cache.retention(),
    ));
    let _sweeper = {
        let _guard = runtime.enter();
        cache.spawn_sweeper(settings.cache.sweep_interval())
    };

    if args.offline {
        let resolver = WeatherResolver::new(Offline, cache);
        launch(&args, &runtime, resolver, workspace, axis)
    } else {
        let weather = &settings.weather;
        let source = OpenMeteo::new(
            &weather.base_url,
            &weather.timezone,
            &weather.user_agent,
            weather.timeout(),
        )?;
        let resolver = WeatherResolver::new(source, cache).with_timeout(weather.timeout());
        launch(&args, &runtime, resolver, workspace, axis)
    }
}
