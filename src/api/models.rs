use serde::{Deserialize, Serialize};

/// One prior turn of the conversation as sent by the mobile client.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct HistoryTurn {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize, Debug)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default)]
    pub history: Vec<HistoryTurn>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Deserialize, Debug)]
pub struct WeatherQuery {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub temperature: i64,
    pub condition: String,
    pub humidity: i64,
    pub wind: f64,
    pub location: String,
}

/// Body of `GET /weather`: either a report or `{"error": "..."}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum WeatherResult {
    Report(WeatherReport),
    Error { error: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarketPrice {
    pub crop: String,
    pub price: u32,
    pub change_percent: f64,
    pub is_up: bool,
}
