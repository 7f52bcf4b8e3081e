//! View state for a weather UI: selected city, latest results, search history
//! and the notice to show after a failed lookup.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::{
    WeatherApi,
    model::{Alert, Forecast, LiveConditions},
};

/// History keeps the most recent searches only.
pub const MAX_HISTORY: usize = 10;

const DEFAULT_CITY: &str = "北京市";
const FORECAST_MISSING: &str = "Failed to get weather information, please try again later.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: u64,
    pub city: String,
    pub adcode: String,
    pub searched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopularCity {
    pub name: &'static str,
    pub adcode: &'static str,
}

pub const POPULAR_CITIES: &[PopularCity] = &[
    PopularCity { name: "北京市", adcode: "110000" },
    PopularCity { name: "上海市", adcode: "310000" },
    PopularCity { name: "广州市", adcode: "440100" },
    PopularCity { name: "深圳市", adcode: "440300" },
    PopularCity { name: "杭州市", adcode: "330100" },
    PopularCity { name: "成都市", adcode: "510100" },
    PopularCity { name: "西安市", adcode: "610100" },
    PopularCity { name: "武汉市", adcode: "420100" },
];

#[derive(Debug)]
pub struct WeatherStore {
    api: Arc<dyn WeatherApi>,
    forecast: Option<Forecast>,
    live: Option<LiveConditions>,
    selected_city: String,
    history: Vec<HistoryEntry>,
    alerts: Vec<Alert>,
    loading: bool,
    error: Option<String>,
    next_history_id: u64,
}

impl WeatherStore {
    pub fn new(api: Arc<dyn WeatherApi>) -> Self {
        Self {
            api,
            forecast: None,
            live: None,
            selected_city: DEFAULT_CITY.to_string(),
            history: Vec::new(),
            alerts: Vec::new(),
            loading: false,
            error: None,
            next_history_id: 1,
        }
    }

    pub fn forecast(&self) -> Option<&Forecast> {
        self.forecast.as_ref()
    }

    pub fn live(&self) -> Option<&LiveConditions> {
        self.live.as_ref()
    }

    pub fn selected_city(&self) -> &str {
        &self.selected_city
    }

    pub fn search_history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn popular_cities(&self) -> &'static [PopularCity] {
        POPULAR_CITIES
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    /// Load the forecast for `city`. On success the city becomes the selection;
    /// otherwise a notice is left in [`error`](Self::error).
    pub async fn fetch_forecast(&mut self, city: &str) {
        self.loading = true;
        self.error = None;

        match self.api.fetch_forecast(city).await {
            Ok(Some(forecast)) => {
                self.forecast = Some(forecast);
                self.selected_city = city.to_string();
            }
            Ok(None) => self.error = Some(FORECAST_MISSING.to_string()),
            Err(err) => self.error = Some(err.user_message()),
        }

        self.loading = false;
    }

    /// Refresh live conditions. Missing data keeps the previous value.
    pub async fn fetch_live(&mut self, city: &str) {
        match self.api.fetch_live_conditions(city).await {
            Ok(Some(live)) => self.live = Some(live),
            Ok(None) => debug!(city, "no live conditions"),
            Err(err) => self.error = Some(err.user_message()),
        }
    }

    pub async fn fetch_alerts(&mut self, region_code: &str) {
        self.alerts = self.api.fetch_alerts(region_code).await;
    }

    /// Record a search. Repeating a city moves it to the front with a fresh timestamp.
    pub fn add_search_history(&mut self, city: &str, adcode: &str) {
        let now = Utc::now();

        if let Some(pos) = self.history.iter().position(|h| h.city == city) {
            let mut entry = self.history.remove(pos);
            entry.searched_at = now;
            self.history.insert(0, entry);
            return;
        }

        let entry = HistoryEntry {
            id: self.next_history_id,
            city: city.to_string(),
            adcode: adcode.to_string(),
            searched_at: now,
        };
        self.next_history_id += 1;

        self.history.insert(0, entry);
        self.history.truncate(MAX_HISTORY);
    }

    pub fn remove_search_history(&mut self, id: u64) {
        self.history.retain(|h| h.id != id);
    }

    pub fn clear_search_history(&mut self) {
        self.history.clear();
    }
}
