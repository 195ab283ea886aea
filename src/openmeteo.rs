use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Client;
use serde::Deserialize;

use crate::error::FetchError;
use crate::timeline::match_tolerance;
use crate::weather::{Coordinate, Field};

pub const ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// One archive request: a point, an inclusive date span and the variables wanted.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyQuery {
    pub coordinate: Coordinate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub fields: Vec<Field>,
}

/// Parallel hourly arrays as returned by the archive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HourlySeries {
    pub times: Vec<Option<NaiveDateTime>>,
    pub values: HashMap<Field, Vec<Option<f64>>>,
}

impl HourlySeries {
    /// First sample within an hour of `target`, else the first sample.
    pub fn index_near(&self, target: NaiveDateTime) -> usize {
        self.times
            .iter()
            .position(|t| t.is_some_and(|t| (t - target).abs() < match_tolerance()))
            .unwrap_or(0)
    }

    pub fn value(&self, field: Field, index: usize) -> Option<f64> {
        self.values
            .get(&field)
            .and_then(|series| series.get(index).copied().flatten())
            .filter(|v| v.is_finite())
    }
}

/// Something that can answer an hourly query.
pub trait WeatherSource: Send + Sync {
    fn fetch_hourly(
        &self,
        query: &HourlyQuery,
    ) -> impl Future<Output = Result<HourlySeries, FetchError>> + Send;
}

pub mod archive {
    use super::*;

    #[derive(Deserialize, Debug)]
    pub struct Response {
        pub hourly: Option<Hourly>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Hourly {
        pub time: Vec<String>,

        #[serde(flatten)]
        pub series: HashMap<String, Vec<Option<f64>>>,
    }

    impl Response {
        pub fn into_series(self) -> Result<HourlySeries, FetchError> {
            let hourly = self
                .hourly
                .ok_or_else(|| FetchError::Malformed("missing hourly block".to_string()))?;

            let times = hourly
                .time
                .iter()
                .map(|t| NaiveDateTime::parse_from_str(t, TIME_FORMAT).ok())
                .collect();
            let values = hourly
                .series
                .into_iter()
                .filter_map(|(name, series)| Field::from_key(&name).map(|f| (f, series)))
                .collect();

            Ok(HourlySeries { times, values })
        }
    }
}

/// Client for the Open-Meteo historical archive.
#[derive(Clone)]
pub struct OpenMeteo {
    client: Client,
    base_url: String,
    timezone: String,
}

impl OpenMeteo {
    pub fn new(
        base_url: &str,
        timezone: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            timezone: timezone.to_string(),
        })
    }

    fn query_params(&self, query: &HourlyQuery) -> Vec<(&'static str, String)> {
        let hourly = query
            .fields
            .iter()
            .map(|f| f.api_param())
            .collect::<Vec<_>>()
            .join(",");
        vec![
            ("latitude", format!("{:.4}", query.coordinate.latitude)),
            ("longitude", format!("{:.4}", query.coordinate.longitude)),
            ("start_date", query.start_date.format("%Y-%m-%d").to_string()),
            ("end_date", query.end_date.format("%Y-%m-%d").to_string()),
            ("hourly", hourly),
            ("timezone", self.timezone.clone()),
        ]
    }
}

impl WeatherSource for OpenMeteo {
    async fn fetch_hourly(&self, query: &HourlyQuery) -> Result<HourlySeries, FetchError> {
        let params = self.query_params(query);
        tracing::info!(?params, "fetching weather data");

        let response: archive::Response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response.into_series()
    }
}

/// A source that is never reachable; every resolution degrades to fallback data.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

impl WeatherSource for Offline {
    async fn fetch_hourly(&self, _query: &HourlyQuery) -> Result<HourlySeries, FetchError> {
        Err(FetchError::Offline)
    }
}
