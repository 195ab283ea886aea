use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as TimeDelta, NaiveDate, NaiveDateTime};

use wxzones::cache::WeatherCache;
use wxzones::error::FetchError;
use wxzones::fallback;
use wxzones::openmeteo::{HourlyQuery, HourlySeries, Offline, WeatherSource};
use wxzones::weather::{Field, Quality, FIELDS};
use wxzones::{
    classify, Coordinate, PlaybackController, RuleSet, TimeAxis, TimeSelector, TimeWindow,
    WeatherResolver,
};

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 8, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .unwrap()
}

/// Answers every query with a complete series; temperature is `20 + hour of day`.
#[derive(Default)]
struct Counting {
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl Counting {
    fn slow(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Some(delay),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl WeatherSource for Counting {
    async fn fetch_hourly(&self, query: &HourlyQuery) -> Result<HourlySeries, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let first = query.start_date.and_hms_opt(0, 0, 0).unwrap();
        let last = query.end_date.and_hms_opt(23, 0, 0).unwrap();
        let hours = (last - first).num_hours() as usize + 1;
        let times: Vec<_> = (0..hours)
            .map(|h| Some(first + TimeDelta::hours(h as i64)))
            .collect();

        let values = query
            .fields
            .iter()
            .map(|&field| {
                let series = (0..hours)
                    .map(|h| match field {
                        Field::Temperature => Some(20.0 + (h % 24) as f64),
                        _ => Some(1.0),
                    })
                    .collect();
                (field, series)
            })
            .collect::<HashMap<_, _>>();

        Ok(HourlySeries { times, values })
    }
}

/// Counts calls and always fails.
#[derive(Default)]
struct Failing {
    calls: AtomicUsize,
}

impl WeatherSource for Failing {
    async fn fetch_hourly(&self, _query: &HourlyQuery) -> Result<HourlySeries, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(FetchError::Malformed("missing hourly block".to_string()))
    }
}

fn resolver<S: WeatherSource>(source: S) -> WeatherResolver<S> {
    WeatherResolver::new(source, Arc::new(WeatherCache::default()))
}

#[tokio::test(start_paused = true)]
async fn repeat_within_ttl_is_served_from_cache() {
    let resolver = resolver(Counting::default());
    let coordinate = Coordinate::new(21.1458, 79.0882);
    let window = TimeWindow::At(at(5, 12));

    let first = resolver.resolve(coordinate, window).await;
    tokio::time::sleep(Duration::from_secs(299)).await;
    let second = resolver.resolve(coordinate, window).await;

    assert_eq!(resolver.source().calls(), 1);
    assert_eq!(first, second);
    assert_eq!(first.quality, Quality::Remote);
    assert_eq!(first.value(Field::Temperature), Some(32.0));

    tokio::time::sleep(Duration::from_secs(2)).await;
    resolver.resolve(coordinate, window).await;
    assert_eq!(resolver.source().calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn same_rounded_key_reuses_the_cached_values() {
    let resolver = resolver(Counting::default());
    let first_point = Coordinate::new(20.0001, 78.0);
    let second_point = Coordinate::new(20.0002, 78.0);

    let a = resolver.resolve(first_point, TimeWindow::At(at(5, 12))).await;
    let b = resolver.resolve(second_point, TimeWindow::At(at(5, 13))).await;

    assert_eq!(resolver.source().calls(), 1);
    assert_eq!(a.values, b.values);
    assert_eq!(a.quality, b.quality);
    assert_eq!(b.timestamp, at(5, 13));
    assert_eq!(b.coordinate, second_point);
    assert!(b.answers(second_point, TimeWindow::At(at(5, 13))));

    let again = resolver.resolve(first_point, TimeWindow::At(at(5, 12))).await;
    assert_eq!(again, a);
}

#[tokio::test(start_paused = true)]
async fn distinct_requests_do_not_share_entries() {
    let resolver = resolver(Counting::default());
    let nagpur = Coordinate::new(21.1458, 79.0882);
    let pune = Coordinate::new(18.5204, 73.8567);

    let a = resolver.resolve(nagpur, TimeWindow::At(at(5, 12))).await;
    let b = resolver.resolve(pune, TimeWindow::At(at(5, 12))).await;
    let c = resolver.resolve(nagpur, TimeWindow::At(at(6, 12))).await;

    assert_eq!(resolver.source().calls(), 3);
    assert_eq!(a.coordinate, nagpur);
    assert_eq!(b.coordinate, pune);
    assert_eq!(c.timestamp, at(6, 12));
    assert_eq!(resolver.cache().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn range_samples_the_midpoint_hour() {
    let resolver = resolver(Counting::default());
    let coordinate = Coordinate::new(20.0, 78.0);

    let obs = resolver
        .resolve(coordinate, TimeWindow::Between(at(4, 12), at(6, 12)))
        .await;
    assert_eq!(obs.timestamp, at(5, 12));
    assert_eq!(obs.value(Field::Temperature), Some(32.0));
    assert!(obs.answers(coordinate, TimeWindow::Between(at(4, 12), at(6, 12))));
}

#[tokio::test(start_paused = true)]
async fn slow_source_times_out_into_fallback() {
    let resolver = resolver(Counting::slow(Duration::from_secs(60)))
        .with_timeout(Duration::from_secs(10));
    let coordinate = Coordinate::new(20.0, 78.0);

    let obs = resolver.resolve(coordinate, TimeWindow::At(at(5, 12))).await;
    assert_eq!(obs.quality, Quality::Fallback);
    assert_eq!(obs.value(Field::Temperature), Some(9.2));
    assert!(resolver.cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failures_are_retried_and_never_cached() {
    let resolver = resolver(Failing::default());
    let coordinate = Coordinate::new(12.34, 56.78);
    let window = TimeWindow::At(at(5, 12));

    let first = resolver.resolve(coordinate, window).await;
    let second = resolver.resolve(coordinate, window).await;

    assert_eq!(resolver.source().calls.load(Ordering::SeqCst), 2);
    assert_eq!(first, second);
    for field in FIELDS {
        assert_eq!(
            first.value(field),
            Some(fallback::fallback(field, 12.34, 56.78))
        );
    }
    assert_eq!(first.value(Field::Temperature), Some(25.0));
}

#[tokio::test(start_paused = true)]
async fn offline_reference_hour_is_red() {
    let axis = TimeAxis::build(at(5, 12));
    let controller = PlaybackController::new(axis.max_index(), axis.reference_index());
    let window = axis.window(&controller.selector());
    assert_eq!(window, TimeWindow::At(at(5, 12)));

    let resolver = resolver(Offline);
    let obs = resolver.resolve(Coordinate::new(20.0, 78.0), window).await;

    assert!(obs.is_fallback());
    assert_eq!(obs.value(Field::Temperature), Some(9.2));
    assert_eq!(obs.value(Field::Humidity), Some(90.0));
    assert_eq!(obs.value(Field::Precipitation), Some(0.2));
    assert_eq!(obs.value(Field::Pressure), Some(1013.2));
    assert_eq!(obs.value(Field::WindSpeed), Some(5.2));
    assert_eq!(classify(&obs, &RuleSet::default_temperature()), "#ff4444");
}

#[tokio::test(start_paused = true)]
async fn playback_ticks_resolve_successive_hours() {
    let axis = TimeAxis::build(at(5, 12));
    let mut controller = PlaybackController::new(axis.max_index(), axis.reference_index());
    let resolver = resolver(Counting::default());
    let coordinate = Coordinate::new(20.0, 78.0);

    controller.play();
    let mut temps = Vec::new();
    for _ in 0..3 {
        assert!(controller.tick());
        let window = axis.window(&controller.selector());
        let obs = resolver.resolve(coordinate, window).await;
        assert!(obs.answers(coordinate, window));
        temps.push(obs.value(Field::Temperature));
    }
    // the first hour fetched answers the rest of the day until it expires
    assert_eq!(temps, vec![Some(33.0); 3]);
    assert_eq!(resolver.source().calls(), 1);

    controller.set_mode(true);
    let TimeSelector::Range { start, end } = controller.selector() else {
        panic!("expected a range");
    };
    assert_eq!(end - start, 48);
}

#[tokio::test(start_paused = true)]
async fn sweeper_drops_expired_entries() {
    let cache = Arc::new(WeatherCache::default());
    let sweeper = cache.spawn_sweeper(Duration::from_secs(600));
    let resolver = WeatherResolver::new(Counting::default(), Arc::clone(&cache));

    resolver
        .resolve(Coordinate::new(20.0, 78.0), TimeWindow::At(at(5, 12)))
        .await;
    assert_eq!(cache.len(), 1);

    tokio::time::sleep(Duration::from_secs(40 * 60)).await;
    assert!(cache.is_empty());
    sweeper.abort();
}
