use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::builder::{styling::AnsiColor, Styles};
use clap::Parser;

const ABOUT: &str = "Weather-colored zones TUI";

const LONG_ABOUT: &str = "
TUI for coloring map zones by historical weather sourced from Open-Meteo.

Zones and color rules are read from a workspace file (the same JSON the map front end saves).
Each zone is resolved at its centroid for the selected hour or range, and colored by the first
matching rule. Use the space bar to animate the timeline, `r` to switch to range mode and `n` to
jump back to now.

When the archive cannot be reached, zones are colored from deterministic fallback values and
marked as such.
";

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default())
    .usage(AnsiColor::Green.on_default())
    .literal(AnsiColor::Green.on_default())
    .placeholder(AnsiColor::Green.on_default());

fn parse_instant(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
}

#[derive(Parser, Debug)]
#[command(version, styles=STYLES, about=ABOUT, long_about = LONG_ABOUT)]
pub struct Args {
    #[arg(
        default_value = "wxzones.json",
        help = "Workspace file with zones and color rules"
    )]
    pub workspace: PathBuf,

    #[arg(long, help = "Configuration file (defaults to ./wxzones.toml if present)")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        value_parser = parse_instant,
        help = "Reference instant instead of now (e.g. 2025-08-05T12:00)"
    )]
    pub at: Option<NaiveDateTime>,

    #[arg(long, help = "Never contact the archive; use fallback values only")]
    pub offline: bool,

    #[arg(long, help = "Print one classification table and exit")]
    pub once: bool,
}
