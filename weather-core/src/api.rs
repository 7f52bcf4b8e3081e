use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    ApiError, WeatherClient,
    model::{Alert, CityMatch, Forecast, LiveConditions},
};

/// What the UI-facing layers consume. [`WeatherClient`] is the real implementation;
/// tests substitute their own.
#[async_trait]
pub trait WeatherApi: Send + Sync + Debug {
    async fn fetch_forecast(&self, city: &str) -> Result<Option<Forecast>, ApiError>;

    async fn fetch_live_conditions(&self, city: &str) -> Result<Option<LiveConditions>, ApiError>;

    async fn search_cities(&self, keyword: &str) -> Result<Vec<CityMatch>, ApiError>;

    async fn fetch_alerts(&self, region_code: &str) -> Vec<Alert>;
}

#[async_trait]
impl WeatherApi for WeatherClient {
    async fn fetch_forecast(&self, city: &str) -> Result<Option<Forecast>, ApiError> {
        WeatherClient::fetch_forecast(self, city).await
    }

    async fn fetch_live_conditions(&self, city: &str) -> Result<Option<LiveConditions>, ApiError> {
        WeatherClient::fetch_live_conditions(self, city).await
    }

    async fn search_cities(&self, keyword: &str) -> Result<Vec<CityMatch>, ApiError> {
        WeatherClient::search_cities(self, keyword).await
    }

    async fn fetch_alerts(&self, region_code: &str) -> Vec<Alert> {
        WeatherClient::fetch_alerts(self, region_code)
    }
}
