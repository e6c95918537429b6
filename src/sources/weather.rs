//! Current-conditions client for an OpenWeather-compatible endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::WeatherSource;
use crate::error::IngestError;
use crate::models::WeatherReading;
use crate::Config;

/// Temperature above which a heatwave warning is raised.
pub const HEATWAVE_TEMP_C: f64 = 38.0;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

// ---

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    main: Option<MainBlock>,
    #[serde(default)]
    weather: Vec<ConditionDescriptor>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ConditionDescriptor {
    main: Option<String>,
}

/// Alert text for a reading: rain first, then heat.
pub fn alert_for(condition: Option<&str>, temp: f64) -> Option<String> {
    // ---
    if condition.is_some_and(|c| c.eq_ignore_ascii_case("rain")) {
        Some("Heavy rain forecast".to_string())
    } else if temp > HEATWAVE_TEMP_C {
        Some("Heatwave warning".to_string())
    } else {
        None
    }
}

/// Turn a raw response body into a reading; a body without `main.temp` is
/// malformed.
fn parse_reading(body: serde_json::Value) -> Result<WeatherReading, IngestError> {
    // ---
    let parsed: CurrentConditions = serde_json::from_value(body)
        .map_err(|e| IngestError::MalformedWeather(e.to_string()))?;

    let main = parsed
        .main
        .ok_or_else(|| IngestError::MalformedWeather("missing 'main' block".into()))?;
    let temp = main
        .temp
        .filter(|t| t.is_finite())
        .ok_or_else(|| IngestError::MalformedWeather("missing 'main.temp'".into()))?;
    let condition = parsed.weather.into_iter().next().and_then(|w| w.main);
    let alert = alert_for(condition.as_deref(), temp);

    Ok(WeatherReading {
        temp,
        humidity: main.humidity,
        condition,
        alert,
    })
}

/// Polls the configured endpoint in metric units for a fixed coordinate.
pub struct OpenWeatherSource {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    lat: f64,
    lon: f64,
}

impl OpenWeatherSource {
    pub fn from_config(config: &Config) -> Result<Self, IngestError> {
        // ---
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            url: config.weather_api_url.clone(),
            api_key: config.weather_api_key.clone(),
            lat: config.weather_lat,
            lon: config.weather_lon,
        })
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherSource {
    async fn current(&self) -> Result<WeatherReading, IngestError> {
        // ---
        let api_key = self.api_key.as_deref().ok_or(IngestError::WeatherDisabled)?;

        let body: serde_json::Value = self
            .client
            .get(&self.url)
            .query(&[
                ("lat", self.lat.to_string().as_str()),
                ("lon", self.lon.to_string().as_str()),
                ("appid", api_key),
                ("units", "metric"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!("Weather response: {}", body);
        parse_reading(body)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_current_conditions() {
        // ---
        let body = json!({
            "coord": { "lon": 77.209, "lat": 28.6139 },
            "weather": [{ "id": 800, "main": "Clear", "description": "clear sky" }],
            "main": { "temp": 31.5, "feels_like": 33.0, "humidity": 48 },
            "name": "Delhi"
        });

        let reading = parse_reading(body).unwrap();
        assert_eq!(reading.temp, 31.5);
        assert_eq!(reading.humidity, Some(48.0));
        assert_eq!(reading.condition.as_deref(), Some("Clear"));
        assert_eq!(reading.alert, None);
    }

    #[test]
    fn rain_raises_alert_regardless_of_temperature() {
        // ---
        let body = json!({
            "weather": [{ "main": "Rain" }, { "main": "Mist" }],
            "main": { "temp": 41.0, "humidity": 90 }
        });

        let reading = parse_reading(body).unwrap();
        assert_eq!(reading.alert.as_deref(), Some("Heavy rain forecast"));
    }

    #[test]
    fn heat_alert_is_strictly_above_threshold() {
        // ---
        assert_eq!(alert_for(Some("Clear"), 38.0), None);
        assert_eq!(
            alert_for(Some("Clear"), 38.1).as_deref(),
            Some("Heatwave warning")
        );
        assert_eq!(alert_for(None, 39.0).as_deref(), Some("Heatwave warning"));
        assert_eq!(
            alert_for(Some("rain"), 20.0).as_deref(),
            Some("Heavy rain forecast")
        );
    }

    #[test]
    fn missing_temperature_is_malformed() {
        // ---
        let no_main = json!({ "weather": [{ "main": "Clear" }] });
        assert!(matches!(
            parse_reading(no_main),
            Err(IngestError::MalformedWeather(_))
        ));

        let no_temp = json!({ "main": { "humidity": 40 } });
        assert!(matches!(
            parse_reading(no_temp),
            Err(IngestError::MalformedWeather(_))
        ));

        let error_body = json!({ "cod": 401, "message": "Invalid API key" });
        assert!(parse_reading(error_body).is_err());
    }

    #[test]
    fn missing_conditions_array_is_tolerated() {
        // ---
        let body = json!({ "main": { "temp": 20.0 } });
        let reading = parse_reading(body).unwrap();
        assert_eq!(reading.condition, None);
        assert_eq!(reading.humidity, None);
    }
}
