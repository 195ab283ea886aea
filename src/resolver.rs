//! Resolves a coordinate and time window to an observation.
//!
//! Resolution never fails: the cache answers when it can, the archive answers
//! when it is reachable, and the fallback generator covers everything else.
//! The returned [`Observation`] says which of those happened through its
//! [`Quality`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};

use crate::cache::{CacheKey, WeatherCache};
use crate::error::FetchError;
use crate::fallback::{self, fallback};
use crate::openmeteo::{HourlyQuery, HourlySeries, WeatherSource};
use crate::weather::{Coordinate, Field, Observation, Quality, TimeWindow, FIELDS};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct WeatherResolver<S> {
    source: S,
    cache: Arc<WeatherCache>,
    timeout: Duration,
}

impl<S: WeatherSource> WeatherResolver<S> {
    pub fn new(source: S, cache: Arc<WeatherCache>) -> Self {
        Self {
            source,
            cache,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cache(&self) -> &Arc<WeatherCache> {
        &self.cache
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn resolve(&self, coordinate: Coordinate, window: TimeWindow) -> Observation {
        let (start_date, end_date) = window.dates();
        let key = CacheKey::new(coordinate, start_date, end_date, &FIELDS);

        if let Some(hit) = self.cache.get_fresh(&key, Instant::now()) {
            tracing::debug!(%coordinate, %start_date, %end_date, "weather cache hit");
            // values come back untouched; identity follows the request
            return Observation {
                timestamp: window.target(),
                coordinate,
                ..hit
            };
        }

        let query = HourlyQuery {
            coordinate,
            start_date,
            end_date,
            fields: FIELDS.to_vec(),
        };

        match self.fetch(&query).await {
            Ok(series) => {
                let observation = sample(&series, coordinate, window);
                self.cache.insert(key, observation.clone(), Instant::now());
                observation
            }
            Err(err) => {
                tracing::warn!(%coordinate, error = %err, "weather source unavailable, using fallback data");
                fallback::observation(coordinate, window.target())
            }
        }
    }

    async fn fetch(&self, query: &HourlyQuery) -> Result<HourlySeries, FetchError> {
        time::timeout(self.timeout, self.source.fetch_hourly(query))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))?
    }
}

/// Builds an observation from the sample nearest the window's target instant.
fn sample(series: &HourlySeries, coordinate: Coordinate, window: TimeWindow) -> Observation {
    let target = window.target();
    let index = series.index_near(target);

    let mut patched = false;
    let values: BTreeMap<Field, f64> = FIELDS
        .iter()
        .map(|&field| {
            let value = series.value(field, index).unwrap_or_else(|| {
                patched = true;
                fallback(field, coordinate.latitude, coordinate.longitude)
            });
            (field, value)
        })
        .collect();

    if patched {
        tracing::debug!(%coordinate, index, "filled missing fields with fallback values");
    }

    Observation {
        values,
        timestamp: target,
        coordinate,
        quality: if patched {
            Quality::Patched
        } else {
            Quality::Remote
        },
    }
}
