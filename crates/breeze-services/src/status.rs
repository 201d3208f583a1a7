//! One-line forecast status shown under each saved location.

use chrono::{DateTime, Duration, Local, Utc};

use breeze_weather::CachedForecast;

pub const NO_CACHED_DATA: &str = "No cached data";

/// "Clear • 20° • Updated 14:05:09", or the placeholder when nothing is cached.
pub fn forecast_status(
    forecast: Option<&CachedForecast>,
    now: DateTime<Utc>,
    stale_after: Duration,
) -> String {
    let Some(forecast) = forecast else {
        return NO_CACHED_DATA.to_string();
    };

    let updated = forecast
        .fetched_at_utc()
        .map(|at| at.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());

    let mut line = format!(
        "{} • {}° • Updated {}",
        forecast.weather,
        format_temperature(forecast.temperature),
        updated
    );
    if forecast.is_stale(stale_after, now) {
        line.push_str(" (stale)");
    }
    line
}

/// Whole degrees print without a fraction, anything else with one decimal.
fn format_temperature(celsius: f64) -> String {
    if celsius.fract() == 0.0 {
        format!("{:.0}", celsius)
    } else {
        format!("{:.1}", celsius)
    }
}
