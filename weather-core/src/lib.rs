//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - [`WeatherClient`]: cached, rate-limited access to the AMap weather and district APIs
//! - The error taxonomy deciding which provider failures reach callers
//! - Configuration & credentials handling
//! - Shared domain models and a small view-state store for UIs
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod alerts;
pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod rate_limit;
pub mod store;

pub use api::WeatherApi;
pub use client::{ClientOptions, WeatherClient};
pub use config::Config;
pub use error::{ApiError, ErrorKind};
pub use model::{Alert, AlertLevel, CityMatch, DailyCast, Forecast, LiveConditions, WeatherCategory};
pub use rate_limit::RateLimiter;
pub use store::WeatherStore;
