use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::api::models::{WeatherReport, WeatherResult};
use crate::error::{AppError, Result};

pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";

const UNAVAILABLE: &str = "Unable to fetch weather";

/// Served whenever no OpenWeatherMap key is configured.
pub static MOCK_WEATHER: Lazy<WeatherReport> = Lazy::new(|| WeatherReport {
    temperature: 28,
    condition: "Sunny (Mock)".to_string(),
    humidity: 65,
    wind: 12.0,
    location: "Uttarakhand (Mock)".to_string(),
});

#[derive(Deserialize)]
struct OwmResponse {
    main: OwmMain,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    wind: OwmWind,
    name: String,
}

#[derive(Deserialize)]
struct OwmMain {
    temp: f64,
    humidity: i64,
}

#[derive(Deserialize)]
struct OwmCondition {
    main: String,
}

#[derive(Deserialize)]
struct OwmWind {
    speed: f64,
}

impl TryFrom<OwmResponse> for WeatherReport {
    type Error = AppError;

    fn try_from(data: OwmResponse) -> Result<Self> {
        let condition = data
            .weather
            .into_iter()
            .next()
            .map(|w| w.main)
            .ok_or_else(|| AppError::ParseError("weather list is empty".to_string()))?;

        Ok(WeatherReport {
            // Truncates toward zero.
            temperature: data.main.temp as i64,
            condition,
            humidity: data.main.humidity,
            wind: data.wind.speed,
            location: data.name,
        })
    }
}

pub struct WeatherClient {
    http: Client,
    api_key: Option<String>,
    base_url: String,
}

impl WeatherClient {
    pub fn new(http: Client, api_key: Option<String>) -> Self {
        WeatherClient {
            http,
            api_key,
            base_url: OPENWEATHER_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Current conditions at the given coordinates, in metric units.
    pub async fn fetch(&self, lat: f64, lon: f64) -> Result<WeatherReport> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(MOCK_WEATHER.clone());
        };

        let url = format!("{}/data/2.5/weather", self.base_url.trim_end_matches('/'));
        let lat = lat.to_string();
        let lon = lon.to_string();

        // Errors are stripped of the URL so the key in the query never reaches a client.
        let res = self
            .http
            .get(url)
            .query(&[("lat", lat.as_str()), ("lon", lon.as_str()), ("appid", api_key), ("units", "metric")])
            .send()
            .await
            .map_err(|e| AppError::from(e.without_url()))?;

        if res.status() != StatusCode::OK {
            tracing::warn!("Weather provider returned {}", res.status());
            return Err(AppError::WeatherError(UNAVAILABLE.to_string()));
        }

        let data: OwmResponse = res
            .json()
            .await
            .map_err(|e| AppError::ParseError(e.without_url().to_string()))?;

        data.try_into()
    }

    /// Like [`fetch`](Self::fetch), but folds any failure into an `{error}` body.
    pub async fn fetch_weather(&self, lat: f64, lon: f64) -> WeatherResult {
        match self.fetch(lat, lon).await {
            Ok(report) => WeatherResult::Report(report),
            Err(AppError::WeatherError(msg)) => WeatherResult::Error { error: msg },
            Err(e) => {
                tracing::warn!("Weather error: {}", e);
                WeatherResult::Error { error: e.to_string() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Json, Query},
        http::StatusCode,
        routing::get,
        Router,
    };
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn no_key_returns_mock_payload() {
        let client = WeatherClient::new(Client::new(), None).with_base_url("http://127.0.0.1:1");
        let result = client.fetch_weather(30.3, 78.0).await;
        assert_eq!(result, WeatherResult::Report(MOCK_WEATHER.clone()));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["temperature"], 28);
        assert_eq!(json["location"], "Uttarakhand (Mock)");
    }

    #[tokio::test]
    async fn reshapes_provider_payload() {
        let app = Router::new().route(
            "/data/2.5/weather",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params["units"], "metric");
                assert_eq!(params["appid"], "owm-key");
                assert_eq!(params["lat"], "29.5");
                Json(serde_json::json!({
                    "main": {"temp": 31.87, "humidity": 48},
                    "weather": [{"main": "Clouds", "description": "scattered clouds"}],
                    "wind": {"speed": 3.6},
                    "name": "Dehradun"
                }))
            }),
        );
        let base = serve(app).await;

        let client = WeatherClient::new(Client::new(), Some("owm-key".into())).with_base_url(base);
        let result = client.fetch_weather(29.5, 78.0).await;
        assert_eq!(
            result,
            WeatherResult::Report(WeatherReport {
                temperature: 31,
                condition: "Clouds".to_string(),
                humidity: 48,
                wind: 3.6,
                location: "Dehradun".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn non_200_is_reported_as_unavailable() {
        let app = Router::new().route(
            "/data/2.5/weather",
            get(|| async { (StatusCode::UNAUTHORIZED, Json(serde_json::json!({"cod": 401}))) }),
        );
        let base = serve(app).await;

        let client = WeatherClient::new(Client::new(), Some("owm-key".into())).with_base_url(base);
        assert_eq!(
            client.fetch_weather(1.0, 2.0).await,
            WeatherResult::Error { error: "Unable to fetch weather".to_string() }
        );
    }

    #[tokio::test]
    async fn malformed_payload_becomes_error_body() {
        let app = Router::new().route(
            "/data/2.5/weather",
            get(|| async { Json(serde_json::json!({"main": {"temp": 20.0}})) }),
        );
        let base = serve(app).await;

        let client = WeatherClient::new(Client::new(), Some("owm-key".into())).with_base_url(base);
        match client.fetch_weather(1.0, 2.0).await {
            WeatherResult::Error { error } => assert!(!error.is_empty()),
            other => panic!("expected error body, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn transport_errors_do_not_leak_the_key() {
        let client = WeatherClient::new(Client::new(), Some("owm-secret".into()))
            .with_base_url("http://127.0.0.1:1");
        match client.fetch_weather(1.0, 2.0).await {
            WeatherResult::Error { error } => assert!(!error.contains("owm-secret")),
            other => panic!("expected error body, got {:?}", other),
        }
    }
}
