//! Plain-text rendering of lookup results.

use std::fmt::Write;
use weather_core::{Alert, CityMatch, Forecast, LiveConditions, WeatherCategory, WeatherStore};

pub fn forecast(f: &Forecast) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {} ({})", f.province, f.city, f.adcode);
    let _ = writeln!(out, "Reported at {}", f.reporttime);

    for cast in &f.casts {
        let category = WeatherCategory::from_condition(&cast.dayweather);
        let _ = writeln!(
            out,
            "  {}  {:<6} {:>3}°C / {:>3}°C  day: {} {}  night: {} {}  [{}]",
            cast.date,
            weekday(&cast.week),
            cast.daytemp,
            cast.nighttemp,
            cast.dayweather,
            cast.daywind,
            cast.nightweather,
            cast.nightwind,
            category.as_str(),
        );
    }
    out
}

pub fn live(l: &LiveConditions) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {} ({})", l.province, l.city, l.adcode);
    let _ = writeln!(
        out,
        "  {} [{}], {}°C, humidity {}%, wind {} {}",
        l.weather,
        WeatherCategory::from_condition(&l.weather).as_str(),
        l.temperature,
        l.humidity,
        l.winddirection,
        l.windpower,
    );
    let _ = writeln!(out, "  Reported at {}", l.reporttime);
    out
}

pub fn cities(cities: &[CityMatch]) -> String {
    if cities.is_empty() {
        return "No matching cities.\n".to_string();
    }

    let mut out = String::new();
    for c in cities {
        let citycode = if c.citycode.is_empty() { "-" } else { c.citycode.as_str() };
        let _ = writeln!(out, "{:<8} {:<5} {}", c.adcode, citycode, c.name);
    }
    out
}

pub fn alerts(alerts: &[Alert]) -> String {
    if alerts.is_empty() {
        return "No active alerts.\n".to_string();
    }

    let mut out = String::new();
    for a in alerts {
        let _ = writeln!(out, "[{}] {}", a.level.as_str().to_uppercase(), a.title);
        let _ = writeln!(out, "  {}", a.content);
        let _ = writeln!(
            out,
            "  valid {} .. {}",
            a.effective_time.format("%Y-%m-%d %H:%M"),
            a.expire_time.format("%Y-%m-%d %H:%M"),
        );
    }
    out
}

pub fn summary(store: &WeatherStore) -> String {
    let mut out = String::new();
    if let Some(f) = store.forecast() {
        out.push_str(&forecast(f));
    }
    if let Some(l) = store.live() {
        out.push_str(&live(l));
    }
    if !store.alerts().is_empty() {
        out.push_str(&alerts(store.alerts()));
    }
    if let Some(error) = store.error() {
        let _ = writeln!(out, "! {error}");
    }
    out
}

fn weekday(week: &str) -> &'static str {
    match week {
        "1" => "Mon",
        "2" => "Tue",
        "3" => "Wed",
        "4" => "Thu",
        "5" => "Fri",
        "6" => "Sat",
        "7" => "Sun",
        _ => "",
    }
}
