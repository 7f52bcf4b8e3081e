use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text};
use std::sync::Arc;
use tracing::debug;
use weather_core::{ApiError, Config, WeatherClient, WeatherStore};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the provider API key and endpoint.
    Configure,

    /// Show the multi-day forecast for a city.
    Forecast {
        /// City name or adcode, e.g. "北京市" or "110000".
        city: String,
    },

    /// Show live conditions for a city.
    Live {
        /// City name or adcode.
        city: String,
    },

    /// Search cities and districts by keyword.
    Search { keyword: String },

    /// Show weather alerts for a region.
    Alerts {
        /// Region adcode, e.g. "110000".
        adcode: String,
    },

    /// Forecast, live conditions and alerts for one or more cities.
    Show {
        #[arg(required = true)]
        cities: Vec<String>,
    },

    /// List the built-in popular cities.
    Popular,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure()?,
            Command::Forecast { city } => {
                match client()?.fetch_forecast(&city).await.map_err(surface)? {
                    Some(forecast) => print!("{}", output::forecast(&forecast)),
                    None => println!("No weather data found for {city}."),
                }
            }
            Command::Live { city } => {
                match client()?.fetch_live_conditions(&city).await.map_err(surface)? {
                    Some(live) => print!("{}", output::live(&live)),
                    None => println!("No live conditions found for {city}."),
                }
            }
            Command::Search { keyword } => {
                let cities = client()?.search_cities(&keyword).await.map_err(surface)?;
                print!("{}", output::cities(&cities));
            }
            Command::Alerts { adcode } => {
                let alerts = client()?.fetch_alerts(&adcode);
                print!("{}", output::alerts(&alerts));
            }
            Command::Show { cities } => show(cities).await?,
            Command::Popular => {
                for city in weather_core::store::POPULAR_CITIES {
                    println!("{:<8} {}", city.adcode, city.name);
                }
            }
        }

        Ok(())
    }
}

fn client() -> Result<WeatherClient> {
    let cfg = Config::load()?.with_env_overrides();
    let options = cfg.client_options()?;
    debug!(base_url = %options.base_url, ttl = ?options.cache_ttl, "building client");
    WeatherClient::new(options).context("Failed to build HTTP client")
}

fn surface(err: ApiError) -> anyhow::Error {
    anyhow!(err.user_message())
}

fn configure() -> Result<()> {
    let mut cfg = Config::load()?;

    let api_key = Password::new("AMap API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let base_url = Text::new("Provider base URL:")
        .with_default(&cfg.base_url)
        .prompt()
        .context("Failed to read base URL")?;

    cfg.set_api_key(api_key.trim().to_string());
    cfg.base_url = base_url.trim().to_string();
    if !cfg.is_configured() {
        bail!("API key must not be empty");
    }
    cfg.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn show(cities: Vec<String>) -> Result<()> {
    let mut store = WeatherStore::new(Arc::new(client()?));
    let mut failed = false;

    for city in &cities {
        store.fetch_forecast(city).await;
        if let Some(error) = store.error() {
            eprintln!("{city}: {error}");
            failed = true;
            continue;
        }
        store.fetch_live(city).await;

        let (name, adcode) = match store.forecast() {
            Some(f) => (f.city.clone(), f.adcode.clone()),
            None => continue,
        };
        store.fetch_alerts(&adcode).await;
        store.add_search_history(&name, &adcode);

        print!("{}", output::summary(&store));
        println!();
    }

    if store.search_history().len() > 1 {
        println!("Recent searches:");
        for entry in store.search_history() {
            println!("  {} ({})", entry.city, entry.adcode);
        }
    }

    if failed {
        bail!("Some lookups failed");
    }
    Ok(())
}
