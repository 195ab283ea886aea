//! Playback over the time axis: selector state, tick transitions and cadence.

use std::time::{Duration, Instant};

/// Half-width of the window derived when switching into range mode.
const RANGE_HALF_WIDTH: usize = 24;
/// Half-width of the window used when jumping back to the reference.
const JUMP_HALF_WIDTH: usize = 12;
/// Cadence at normal speed.
const BASE_INTERVAL: Duration = Duration::from_millis(1000);

/// Playback speed multiplier options.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackSpeed {
    Half,
    #[default]
    Normal,
    Double,
    Quadruple,
}

impl PlaybackSpeed {
    pub fn label(&self) -> &'static str {
        match self {
            PlaybackSpeed::Half => "0.5x",
            PlaybackSpeed::Normal => "1x",
            PlaybackSpeed::Double => "2x",
            PlaybackSpeed::Quadruple => "4x",
        }
    }

    pub fn all() -> &'static [PlaybackSpeed] {
        &[
            PlaybackSpeed::Half,
            PlaybackSpeed::Normal,
            PlaybackSpeed::Double,
            PlaybackSpeed::Quadruple,
        ]
    }

    pub fn multiplier(&self) -> f32 {
        match self {
            PlaybackSpeed::Half => 0.5,
            PlaybackSpeed::Normal => 1.0,
            PlaybackSpeed::Double => 2.0,
            PlaybackSpeed::Quadruple => 4.0,
        }
    }

    /// Time between ticks at this speed.
    pub fn interval(&self) -> Duration {
        BASE_INTERVAL.div_f32(self.multiplier())
    }
}

/// Which part of the axis is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeSelector {
    Point(usize),
    Range { start: usize, end: usize },
}

impl TimeSelector {
    pub fn is_range(&self) -> bool {
        matches!(self, TimeSelector::Range { .. })
    }
}

/// Selector state machine driven by an external scheduler through [`tick`].
///
/// [`tick`]: PlaybackController::tick
#[derive(Debug, Clone)]
pub struct PlaybackController {
    selector: TimeSelector,
    playing: bool,
    speed: PlaybackSpeed,
    max_index: usize,
    reference_index: usize,
}

impl PlaybackController {
    /// Starts paused, in point mode, at the reference index.
    pub fn new(max_index: usize, reference_index: usize) -> Self {
        let reference_index = reference_index.min(max_index);
        Self {
            selector: TimeSelector::Point(reference_index),
            playing: false,
            speed: PlaybackSpeed::default(),
            max_index,
            reference_index,
        }
    }

    pub fn selector(&self) -> TimeSelector {
        self.selector
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.speed
    }

    pub fn max_index(&self) -> usize {
        self.max_index
    }

    pub fn set_speed(&mut self, speed: PlaybackSpeed) {
        self.speed = speed;
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn toggle(&mut self) {
        self.playing = !self.playing;
    }

    fn window_around(&self, center: usize, half: usize) -> TimeSelector {
        TimeSelector::Range {
            start: center.saturating_sub(half),
            end: (center + half).min(self.max_index),
        }
    }

    pub fn set_mode(&mut self, range: bool) {
        self.selector = match (self.selector, range) {
            (TimeSelector::Point(i), true) => self.window_around(i, RANGE_HALF_WIDTH),
            (TimeSelector::Range { start, .. }, false) => TimeSelector::Point(start),
            (current, _) => current,
        };
    }

    pub fn jump_to_reference(&mut self) {
        self.selector = match self.selector {
            TimeSelector::Point(_) => TimeSelector::Point(self.reference_index),
            TimeSelector::Range { .. } => self.window_around(self.reference_index, JUMP_HALF_WIDTH),
        };
    }

    pub fn select_point(&mut self, index: usize) {
        self.selector = TimeSelector::Point(index.min(self.max_index));
    }

    pub fn select_range(&mut self, a: usize, b: usize) {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        self.selector = TimeSelector::Range {
            start: start.min(self.max_index),
            end: end.min(self.max_index),
        };
    }

    /// Manual scrub by `delta` indices, clamped at both ends and keeping the range width.
    pub fn step(&mut self, delta: isize) {
        let shift = |i: usize| i.saturating_add_signed(delta).min(self.max_index);
        self.selector = match self.selector {
            TimeSelector::Point(i) => TimeSelector::Point(shift(i)),
            TimeSelector::Range { start, end } => {
                let width = end - start;
                let start = shift(start).min(self.max_index - width.min(self.max_index));
                TimeSelector::Range {
                    start,
                    end: (start + width).min(self.max_index),
                }
            }
        };
    }

    /// Advances one index while playing, wrapping to the start of the axis.
    ///
    /// Returns whether the selector moved.
    pub fn tick(&mut self) -> bool {
        if !self.playing {
            return false;
        }
        self.selector = match self.selector {
            TimeSelector::Point(i) if i >= self.max_index => TimeSelector::Point(0),
            TimeSelector::Point(i) => TimeSelector::Point(i + 1),
            TimeSelector::Range { start, end } if end >= self.max_index => TimeSelector::Range {
                start: 0,
                end: (end - start).min(self.max_index),
            },
            TimeSelector::Range { start, end } => TimeSelector::Range {
                start: start + 1,
                end: end + 1,
            },
        };
        true
    }
}

/// The single playback timer. Holds at most one pending deadline.
#[derive(Debug, Clone, Default)]
pub struct Ticker {
    next: Option<Instant>,
    period: Duration,
}

impl Ticker {
    /// Arms the timer; the first tick is one full period away.
    pub fn start(&mut self, now: Instant, period: Duration) {
        self.period = period;
        self.next = Some(now + period);
    }

    pub fn stop(&mut self) {
        self.next = None;
    }

    /// Replaces the cadence of a running timer.
    pub fn retime(&mut self, now: Instant, period: Duration) {
        if self.next.is_some() {
            self.start(now, period);
        } else {
            self.period = period;
        }
    }

    pub fn is_running(&self) -> bool {
        self.next.is_some()
    }

    /// Time left until the next tick, if running.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.next.map(|next| next.saturating_duration_since(now))
    }

    /// Consumes one due tick and schedules the following one.
    pub fn due(&mut self, now: Instant) -> bool {
        match self.next {
            Some(next) if now >= next => {
                self.next = Some(next + self.period);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing(max: usize, selector: TimeSelector) -> PlaybackController {
        let mut pc = PlaybackController::new(max, 0);
        pc.selector = selector;
        pc.play();
        pc
    }

    #[test]
    fn point_wraps_past_the_end() {
        let mut pc = playing(360, TimeSelector::Point(360));
        assert!(pc.tick());
        assert_eq!(pc.selector(), TimeSelector::Point(0));

        let mut pc = playing(360, TimeSelector::Point(359));
        pc.tick();
        assert_eq!(pc.selector(), TimeSelector::Point(360));
    }

    #[test]
    fn range_wraps_keeping_width() {
        let mut pc = playing(360, TimeSelector::Range { start: 349, end: 360 });
        pc.tick();
        assert_eq!(pc.selector(), TimeSelector::Range { start: 0, end: 11 });
        pc.tick();
        assert_eq!(pc.selector(), TimeSelector::Range { start: 1, end: 12 });

        let mut pc = playing(360, TimeSelector::Range { start: 348, end: 359 });
        pc.tick();
        assert_eq!(pc.selector(), TimeSelector::Range { start: 349, end: 360 });
    }

    #[test]
    fn paused_ticks_do_nothing() {
        let mut pc = PlaybackController::new(360, 100);
        assert!(!pc.tick());
        assert_eq!(pc.selector(), TimeSelector::Point(100));
    }

    #[test]
    fn mode_switches_derive_from_current_point() {
        let mut pc = PlaybackController::new(360, 180);
        pc.select_point(100);
        pc.set_mode(true);
        assert_eq!(pc.selector(), TimeSelector::Range { start: 76, end: 124 });
        pc.set_mode(true);
        assert_eq!(pc.selector(), TimeSelector::Range { start: 76, end: 124 });
        pc.set_mode(false);
        assert_eq!(pc.selector(), TimeSelector::Point(76));

        pc.select_point(10);
        pc.set_mode(true);
        assert_eq!(pc.selector(), TimeSelector::Range { start: 0, end: 34 });
        pc.select_point(350);
        pc.set_mode(true);
        assert_eq!(pc.selector(), TimeSelector::Range { start: 326, end: 360 });
    }

    #[test]
    fn jump_uses_narrower_window_in_range_mode() {
        let mut pc = PlaybackController::new(360, 180);
        pc.select_point(3);
        pc.jump_to_reference();
        assert_eq!(pc.selector(), TimeSelector::Point(180));

        pc.select_range(0, 5);
        pc.jump_to_reference();
        assert_eq!(pc.selector(), TimeSelector::Range { start: 168, end: 192 });
    }

    #[test]
    fn inputs_are_clamped() {
        let mut pc = PlaybackController::new(360, 9_999);
        assert_eq!(pc.selector(), TimeSelector::Point(360));
        pc.select_range(400, 350);
        assert_eq!(pc.selector(), TimeSelector::Range { start: 350, end: 360 });
        pc.step(5);
        assert_eq!(pc.selector(), TimeSelector::Range { start: 350, end: 360 });
        pc.step(-400);
        assert_eq!(pc.selector(), TimeSelector::Range { start: 0, end: 10 });
        pc.select_point(2);
        pc.step(-5);
        assert_eq!(pc.selector(), TimeSelector::Point(0));
    }

    #[test]
    fn speed_sets_cadence() {
        assert_eq!(PlaybackSpeed::Half.interval(), Duration::from_millis(2000));
        assert_eq!(PlaybackSpeed::Normal.interval(), Duration::from_millis(1000));
        assert_eq!(PlaybackSpeed::Double.interval(), Duration::from_millis(500));
        assert_eq!(PlaybackSpeed::Quadruple.interval(), Duration::from_millis(250));
    }

    #[test]
    fn ticker_never_fires_on_start() {
        let t0 = Instant::now();
        let mut ticker = Ticker::default();
        ticker.start(t0, Duration::from_millis(1000));
        assert!(!ticker.due(t0));
        assert!(!ticker.due(t0 + Duration::from_millis(999)));
        assert!(ticker.due(t0 + Duration::from_millis(1000)));
        assert!(!ticker.due(t0 + Duration::from_millis(1500)));
        assert!(ticker.due(t0 + Duration::from_millis(2000)));
    }

    #[test]
    fn retime_replaces_the_cadence() {
        let t0 = Instant::now();
        let mut ticker = Ticker::default();
        ticker.start(t0, Duration::from_millis(1000));
        ticker.retime(t0 + Duration::from_millis(100), Duration::from_millis(250));
        assert_eq!(
            ticker.remaining(t0 + Duration::from_millis(100)),
            Some(Duration::from_millis(250))
        );
        assert!(ticker.due(t0 + Duration::from_millis(350)));

        ticker.stop();
        ticker.retime(t0, Duration::from_millis(500));
        assert!(!ticker.is_running());
        assert!(!ticker.due(t0 + Duration::from_secs(10)));
    }
}
