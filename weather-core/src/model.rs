use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// The three provider-backed lookups. Each one owns a cache-key namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Forecast,
    Live,
    Search,
}

impl Operation {
    /// Prefix used when rendering a cache key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Forecast => "weather",
            Operation::Live => "live",
            Operation::Search => "search",
        }
    }

    /// Human-readable name used in provider error messages.
    pub fn description(&self) -> &'static str {
        match self {
            Operation::Forecast => "Get weather forecast",
            Operation::Live => "Get live weather",
            Operation::Search => "Search cities",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Multi-day forecast for one city (`extensions=all`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Forecast {
    pub city: String,
    pub adcode: String,
    pub province: String,
    pub reporttime: String,
    pub casts: Vec<DailyCast>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyCast {
    pub date: String,
    pub week: String,
    pub dayweather: String,
    pub nightweather: String,
    pub daytemp: String,
    pub nighttemp: String,
    pub daywind: String,
    pub nightwind: String,
    pub daypower: String,
    pub nightpower: String,
    pub daytemp_float: Option<String>,
    pub nighttemp_float: Option<String>,
}

/// Live observation for one city (`extensions=base`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConditions {
    pub province: String,
    pub city: String,
    pub adcode: String,
    pub weather: String,
    pub temperature: String,
    pub winddirection: String,
    pub windpower: String,
    pub humidity: String,
    pub reporttime: String,
    pub temperature_float: Option<String>,
    pub humidity_float: Option<String>,
}

/// One district returned by a city search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityMatch {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub adcode: String,
    /// Provinces carry no city code; the provider sends `[]` for those.
    #[serde(default, deserialize_with = "lenient_string")]
    pub citycode: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Blue,
    Yellow,
    Orange,
    Red,
    Black,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Blue => "blue",
            AlertLevel::Yellow => "yellow",
            AlertLevel::Orange => "orange",
            AlertLevel::Red => "red",
            AlertLevel::Black => "black",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub kind: String,
    pub title: String,
    pub content: String,
    pub publish_time: DateTime<Utc>,
    pub effective_time: DateTime<Utc>,
    pub expire_time: DateTime<Utc>,
}

/// Coarse condition bucket derived from a provider weather description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCategory {
    #[default]
    Sunny,
    Cloudy,
    Rainy,
    Snowy,
    Windy,
    Foggy,
}

impl WeatherCategory {
    /// Classify a provider condition string such as "小雨" or "Light rain".
    pub fn from_condition(condition: &str) -> Self {
        let c = condition.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| c.contains(n));

        if has(&["雪", "snow", "sleet"]) {
            Self::Snowy
        } else if has(&["雨", "rain", "drizzle", "shower", "thunder"]) {
            Self::Rainy
        } else if has(&["雾", "霾", "fog", "haze", "mist"]) {
            Self::Foggy
        } else if has(&["风", "wind", "gale"]) {
            Self::Windy
        } else if has(&["云", "阴", "cloud", "overcast"]) {
            Self::Cloudy
        } else {
            Self::Sunny
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sunny => "sunny",
            Self::Cloudy => "cloudy",
            Self::Rainy => "rainy",
            Self::Snowy => "snowy",
            Self::Windy => "windy",
            Self::Foggy => "foggy",
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LenientString {
    Text(String),
    List(Vec<serde_json::Value>),
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match LenientString::deserialize(deserializer)? {
        LenientString::Text(s) => s,
        LenientString::List(_) => String::new(),
    })
}
