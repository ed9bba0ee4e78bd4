use chrono::{DateTime, Utc};
use chrono::serde::{ts_seconds, ts_seconds_option};
use serde::{Deserialize, Serialize};

/// Coordinates of one fetch call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastRequest {
    pub latitude: f64,
    pub longitude: f64,
}

impl ForecastRequest {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// `"<latitude>,<longitude>"` as it appears in the request path.
    pub fn coordinates_segment(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Decoded forecast document.
///
/// Shape follows the provider's JSON; all times are Unix seconds on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub latitude: f64,
    pub longitude: f64,
    /// IANA timezone name of the requested location.
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
    pub daily: DataBlock,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alerts: Vec<Alert>,
}

impl Forecast {
    /// Start of validity: the time of the first daily entry.
    pub fn valid_from(&self) -> Option<DateTime<Utc>> {
        self.daily.data.first().map(|day| day.time)
    }

    pub fn days(&self) -> impl Iterator<Item = &DailyDataPoint> {
        self.daily.data.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub data: Vec<DailyDataPoint>,
}

/// One day of the weekly forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyDataPoint {
    /// Midnight of the day in the location's timezone.
    #[serde(with = "ts_seconds")]
    pub time: DateTime<Utc>,
    pub summary: String,
    pub temperature_high: f64,
    pub temperature_low: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, with = "ts_seconds_option", skip_serializing_if = "Option::is_none")]
    pub sunrise_time: Option<DateTime<Utc>>,
    #[serde(default, with = "ts_seconds_option", skip_serializing_if = "Option::is_none")]
    pub sunset_time: Option<DateTime<Utc>>,
    /// 0..=1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precip_probability: Option<f64>,
    /// "rain", "snow" or "sleet".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precip_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_cover: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv_index: Option<f64>,
}

/// Severe weather alert issued for the location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(with = "ts_seconds")]
    pub time: DateTime<Utc>,
    #[serde(default, with = "ts_seconds_option", skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    pub description: String,
    pub uri: String,
    #[serde(default)]
    pub regions: Vec<String>,
}
