pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod llm;
pub mod responses;
pub mod weather;

use std::sync::Arc;

use cache::ResponseCache;
use config::Config;
use llm::AdviceProvider;
use weather::WeatherClient;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: ResponseCache,
    pub advisor: Arc<dyn AdviceProvider>,
    pub weather: Arc<WeatherClient>,
}
