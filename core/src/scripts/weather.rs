//! 24 hour forecast check with alerts for rain, snow, storms and extreme
//! temperatures.

use crate::http;
use crate::template::{Context, Script};
use crate::{Error, Outcome, Result};
use chrono::{DateTime, FixedOffset};
use clap::Parser;
use serde::Deserialize;

/// Forecast slots requested: eight 3-hour slots cover the next day.
const SLOTS: &str = "8";
const HEAT_LIMIT: f64 = 35.0;
const COLD_LIMIT: f64 = -10.0;

/// Weather alert bot with forecast checking.
#[derive(Debug, Parser)]
#[command(name = "weather-alert", version)]
pub struct WeatherAlert {
    /// City name (e.g. 'London', 'New York')
    pub city: String,
    /// OpenWeatherMap API key (or set OPENWEATHER_API_KEY)
    #[arg(short = 'k', long)]
    pub api_key: Option<String>,
    /// Show detailed forecast
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Forecast {
    pub list: Vec<Slot>,
    pub city: City,
}

#[derive(Debug, Clone, Deserialize)]
pub struct City {
    pub name: String,
    #[serde(default)]
    pub country: String,
    /// Offset from UTC in seconds.
    #[serde(default)]
    pub timezone: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Slot {
    pub dt: i64,
    pub main: Readings,
    pub weather: Vec<Condition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Readings {
    pub temp: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    pub main: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub city: String,
    pub country: String,
    pub alerts: Vec<String>,
    pub conditions: Vec<String>,
    pub temp_min: f64,
    pub temp_max: f64,
    pub temp_avg: f64,
}

pub fn fetch_forecast(ctx: &Context, city: &str, api_key: &str) -> Result<Forecast> {
    let weather = &ctx.config.weather;
    tracing::debug!(endpoint = %weather.endpoint, city, "fetching forecast");
    let response = http::client(&ctx.config)?
        .get(&weather.endpoint)
        .query(&[
            ("q", city),
            ("appid", api_key),
            ("units", weather.units.as_str()),
            ("cnt", SLOTS),
        ])
        .send()?;
    Ok(http::check(response)?.json()?)
}

pub fn analyze_forecast(forecast: &Forecast) -> Result<Analysis> {
    if forecast.list.is_empty() {
        return Err(Error::malformed("forecast contains no time slots"));
    }
    let offset = FixedOffset::east_opt(forecast.city.timezone)
        .or_else(|| FixedOffset::east_opt(0))
        .ok_or_else(|| Error::malformed("invalid timezone offset"))?;

    let mut alerts = Vec::new();
    let mut conditions = Vec::new();
    let mut temps = Vec::with_capacity(forecast.list.len());

    for slot in &forecast.list {
        let temp = slot.main.temp;
        temps.push(temp);

        if let Some(condition) = slot.weather.first() {
            conditions.push(condition.description.clone());
            let kind = match condition.main.as_str() {
                "Rain" | "Drizzle" => Some("Rain"),
                "Snow" => Some("Snow"),
                "Thunderstorm" => Some("Thunderstorm"),
                _ => None,
            };
            if let Some(kind) = kind {
                alerts.push(format!(
                    "{kind} expected around {}: {}",
                    slot_hour(slot.dt, &offset),
                    condition.description
                ));
            }
        }

        if temp > HEAT_LIMIT {
            alerts.push(format!("Extreme heat: {temp:.1}C"));
        } else if temp < COLD_LIMIT {
            alerts.push(format!("Extreme cold: {temp:.1}C"));
        }
    }

    let temp_min = temps.iter().copied().fold(f64::INFINITY, f64::min);
    let temp_max = temps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let temp_avg = temps.iter().sum::<f64>() / temps.len() as f64;

    Ok(Analysis {
        city: forecast.city.name.clone(),
        country: forecast.city.country.clone(),
        alerts,
        conditions,
        temp_min,
        temp_max,
        temp_avg,
    })
}

/// 12-hour clock label such as `03PM`, in the city's local time.
fn slot_hour(timestamp: i64, offset: &FixedOffset) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|utc| utc.with_timezone(offset).format("%I%p").to_string())
        .unwrap_or_else(|| "unknown time".to_string())
}

impl Script for WeatherAlert {
    fn validate(&self, ctx: &Context) -> Result<()> {
        if self.api_key.is_none() && ctx.config.weather.api_key.is_none() {
            return Err(Error::invocation(
                "API key required: pass -k or set OPENWEATHER_API_KEY (free key at https://openweathermap.org/api)",
            ));
        }
        Ok(())
    }

    fn run(self, ctx: &mut Context) -> Result<Outcome> {
        let api_key = self
            .api_key
            .clone()
            .or_else(|| ctx.config.weather.api_key.clone())
            .ok_or_else(|| Error::invocation("API key required"))?;

        ctx.reporter.info(format!("Fetching weather for {}...", self.city));
        let forecast = fetch_forecast(ctx, &self.city, &api_key)?;
        let analysis = analyze_forecast(&forecast)?;

        let reporter = &mut ctx.reporter;
        reporter.info(format!("Weather for {}, {}", analysis.city, analysis.country));
        reporter.info(format!(
            "Temperature: {:.1}C - {:.1}C (avg: {:.1}C)",
            analysis.temp_min, analysis.temp_max, analysis.temp_avg
        ));

        if !analysis.alerts.is_empty() {
            reporter.warn(format!(
                "{} alert(s) for next 24 hours:",
                analysis.alerts.len()
            ));
            for alert in &analysis.alerts {
                reporter.raw(format!("  - {alert}"));
            }
        }

        if self.verbose {
            reporter.info("Forecast conditions:");
            let mut seen: Vec<&str> = Vec::new();
            for condition in &analysis.conditions {
                if !seen.contains(&condition.as_str()) {
                    seen.push(condition);
                    reporter.raw(format!("  - {condition}"));
                }
            }
        }

        if analysis.alerts.is_empty() {
            Ok(Outcome::ok("No weather alerts for next 24 hours"))
        } else {
            Ok(Outcome::ok(format!(
                "Forecast checked: {} alert(s)",
                analysis.alerts.len()
            )))
        }
    }
}
