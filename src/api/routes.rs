use axum::{
    routing::{get, post},
    Router,
    extract::{Json, Query, State},
};
use once_cell::sync::Lazy;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;

use crate::error::{Result, AppError};
use crate::api::models::{ChatRequest, ChatResponse, MarketPrice, WeatherQuery, WeatherResult};
use crate::cache::CACHE_TTL_SECS;
use crate::llm::get_agri_advice;
use crate::AppState;

static MARKET_PRICES: Lazy<Vec<MarketPrice>> = Lazy::new(|| {
    [
        ("Wheat", 2125, 2.5, true),
        ("Rice", 3450, 1.2, false),
        ("Maize", 1890, 0.8, true),
        ("Potato", 1200, 5.0, true),
    ]
    .into_iter()
    .map(|(crop, price, change_percent, is_up)| MarketPrice {
        crop: crop.to_string(),
        price,
        change_percent,
        is_up,
    })
    .collect()
});

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/weather", get(weather_handler))
        .route("/market_prices", get(market_prices_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Cache key for a fresh query: case and surrounding whitespace are ignored.
pub fn cache_key(query: &str) -> String {
    format!("chat:{}", query.to_lowercase().trim())
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let start_time = std::time::Instant::now();

    let result = tokio::time::timeout(state.config.chat_timeout, answer_chat(&state, &req)).await;
    tracing::debug!("Chat request took {:?}", start_time.elapsed());

    match result {
        Ok(reply) => Ok(Json(ChatResponse { reply })),
        Err(_) => {
            tracing::warn!("Chat request timed out after {:?}", state.config.chat_timeout);
            Err(AppError::Timeout("Request processing timed out".to_string()))
        }
    }
}

async fn answer_chat(state: &AppState, req: &ChatRequest) -> String {
    let cache_key = cache_key(&req.query);

    // The key ignores history, so only context-free queries may use the cache.
    let use_cache = req.history.is_empty() && state.cache.is_enabled();

    if use_cache {
        match state.cache.get(&cache_key).await {
            Ok(Some(cached)) if !cached.is_empty() => {
                tracing::debug!("Cache hit for: {}", req.query);
                return cached;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Redis read error: {}", e),
        }
    }

    let reply = get_agri_advice(state.advisor.as_ref(), &req.query, &req.history).await;

    if use_cache && !reply.is_empty() {
        if let Err(e) = state.cache.set(&cache_key, &reply, CACHE_TTL_SECS).await {
            tracing::warn!("Redis write error: {}", e);
        }
    }

    reply
}

async fn weather_handler(
    State(state): State<AppState>,
    Query(params): Query<WeatherQuery>,
) -> Json<WeatherResult> {
    Json(state.weather.fetch_weather(params.lat, params.lon).await)
}

async fn market_prices_handler() -> Json<Vec<MarketPrice>> {
    Json(MARKET_PRICES.clone())
}
