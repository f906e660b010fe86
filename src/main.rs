use std::sync::Arc;
use std::time::Duration;
use reqwest::ClientBuilder;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use beejx_gateway::{
    api::routes::create_router,
    cache::ResponseCache,
    config::{AdviceBackend, Config},
    llm::{AdviceProvider, GeminiClient},
    responses::KeywordResponder,
    weather::WeatherClient,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration (also pulls in .env, which may set RUST_LOG)
    let config = Config::load()?;
    let server_addr = config.server_addr;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // One HTTP client for every outbound call, with explicit timeouts
    let http = ClientBuilder::new()
        .timeout(config.http_timeout)
        .connect_timeout(Duration::from_secs(5))
        .pool_max_idle_per_host(10)
        .build()?;

    let cache = ResponseCache::connect(&config.redis_host, config.redis_port).await;

    let advisor: Arc<dyn AdviceProvider> = match config.advice_backend {
        AdviceBackend::Gemini => {
            if config.google_api_key.is_none() {
                tracing::warn!("GOOGLE_API_KEY not set - chat replies will report a missing key");
            }
            Arc::new(GeminiClient::new(
                http.clone(),
                config.google_api_key.clone(),
                config.gemini_model.clone(),
            ))
        }
        AdviceBackend::Keyword => {
            tracing::info!("Using offline keyword responder for chat");
            Arc::new(KeywordResponder)
        }
    };

    if config.openweather_api_key.is_none() {
        tracing::warn!("OPENWEATHER_API_KEY not set - serving mock weather");
    }
    let weather = WeatherClient::new(http, config.openweather_api_key.clone());

    // Create application state
    let app_state = AppState {
        config: Arc::new(config),
        cache,
        advisor,
        weather: Arc::new(weather),
    };

    // Build the router with routes
    let app = create_router(app_state);

    let listener = TcpListener::bind(server_addr).await?;

    tracing::info!("Listening on {}", server_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
