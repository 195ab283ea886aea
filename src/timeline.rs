//! Discrete time axis anchored at midnight of the reference day.

use chrono::{Duration, NaiveDateTime, NaiveTime};

use crate::playback::TimeSelector;
use crate::weather::TimeWindow;

/// Entries this far or farther from a requested instant are not matched.
pub fn match_tolerance() -> Duration {
    Duration::hours(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSpec {
    pub days_before: i64,
    pub days_after: i64,
    pub step: Duration,
}

impl Default for AxisSpec {
    fn default() -> Self {
        Self {
            days_before: 15,
            days_after: 15,
            step: Duration::hours(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimeAxis {
    stamps: Vec<NaiveDateTime>,
    step: Duration,
    reference: NaiveDateTime,
    reference_index: usize,
}

/// First and last instants of the window, if representable.
fn span(midnight: NaiveDateTime, spec: AxisSpec) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let before = Duration::try_days(spec.days_before.max(0))?;
    let after = Duration::try_days(spec.days_after.max(0))?;
    Some((
        midnight.checked_sub_signed(before)?,
        midnight.checked_add_signed(after)?,
    ))
}

impl TimeAxis {
    /// Hourly axis spanning fifteen days either side of the reference day.
    pub fn build(reference: NaiveDateTime) -> Self {
        Self::build_with(reference, AxisSpec::default())
    }

    pub fn build_with(reference: NaiveDateTime, spec: AxisSpec) -> Self {
        let step = if spec.step > Duration::zero() {
            spec.step
        } else {
            Duration::hours(1)
        };
        let midnight = reference.date().and_time(NaiveTime::MIN);
        let (start, end) = span(midnight, spec).unwrap_or_else(|| {
            tracing::warn!(?spec, "axis span out of range, using the default window");
            span(midnight, AxisSpec::default()).unwrap_or((midnight, midnight))
        });

        let mut stamps = Vec::new();
        let mut next = Some(start);
        while let Some(ts) = next.filter(|ts| *ts <= end) {
            stamps.push(ts);
            next = ts.checked_add_signed(step);
        }

        let mut axis = Self {
            stamps,
            step,
            reference,
            reference_index: 0,
        };
        axis.reference_index = axis.index_of(reference).unwrap_or(0);
        axis
    }

    /// Index of the entry nearest `ts`, if one lies within the match tolerance.
    pub fn index_of(&self, ts: NaiveDateTime) -> Option<usize> {
        self.stamps
            .iter()
            .enumerate()
            .map(|(i, stamp)| (i, (*stamp - ts).abs()))
            .filter(|(_, gap)| *gap < match_tolerance())
            .min_by_key(|(_, gap)| *gap)
            .map(|(i, _)| i)
    }

    pub fn reference(&self) -> NaiveDateTime {
        self.reference
    }

    pub fn reference_index(&self) -> usize {
        self.reference_index
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    pub fn max_index(&self) -> usize {
        self.stamps.len().saturating_sub(1)
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    pub fn get(&self, index: usize) -> Option<NaiveDateTime> {
        self.stamps.get(index).copied()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.stamps
    }

    pub fn first(&self) -> NaiveDateTime {
        self.stamps[0]
    }

    pub fn last(&self) -> NaiveDateTime {
        self.stamps[self.max_index()]
    }

    fn at(&self, index: usize) -> NaiveDateTime {
        self.stamps[index.min(self.max_index())]
    }

    /// Timestamps a selector points at, clamped to the axis.
    pub fn window(&self, selector: &TimeSelector) -> TimeWindow {
        match *selector {
            TimeSelector::Point(i) => TimeWindow::At(self.at(i)),
            TimeSelector::Range { start, end } => {
                let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
                TimeWindow::Between(self.at(lo), self.at(hi))
            }
        }
    }
}
