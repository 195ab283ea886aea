//! Weather-colored zones over a scrubbable time axis.
//!
//! The pieces, leaf first:
//!
//! * [`timeline::TimeAxis`]: hourly timestamps around the reference day.
//! * [`playback::PlaybackController`]: point or range selection that ticks and wraps.
//! * [`resolver::WeatherResolver`]: coordinate plus time window to an [`weather::Observation`],
//!   through [`cache::WeatherCache`] and the archive, degrading to [`fallback`] values.
//! * [`rules::RuleSet`]: ordered first-match thresholds mapping an observation to a color.

pub mod cache;
pub mod config;
pub mod error;
pub mod fallback;
pub mod openmeteo;
pub mod playback;
pub mod resolver;
pub mod rules;
pub mod timeline;
pub mod units;
pub mod weather;
pub mod workspace;

pub use playback::{PlaybackController, TimeSelector};
pub use resolver::WeatherResolver;
pub use rules::{classify, RuleSet};
pub use timeline::TimeAxis;
pub use weather::{Coordinate, Observation, TimeWindow};
