use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use levermann_core::domain::history::History;
use levermann_core::domain::instrument::InstrumentHeader;
use levermann_core::domain::recommendation::{recommendation, Recommendation};
use levermann_core::domain::result::EvaluationResult;
use levermann_core::storage::{self, StoredHistory, SymbolSummary};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = levermann_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();
    let pool: Option<PgPool> = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match storage::migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
                None
            }
        },
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing; starting API in degraded mode");
            None
        }
    };

    let app = router(AppState { pool });

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/instruments", get(list_instruments))
        .route("/instruments/:symbol/latest", get(get_latest))
        .route("/instruments/:symbol/history", get(get_history))
        .route(
            "/instruments/:symbol/recommendation",
            get(get_recommendation),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Clone)]
struct AppState {
    pool: Option<PgPool>,
}

#[derive(Debug, Serialize)]
struct ApiLatest {
    instrument: InstrumentHeader,
    result: EvaluationResult,
    recommendation: Recommendation,
}

#[derive(Debug, Serialize)]
struct ApiHistory {
    symbol: String,
    results: History,
}

#[derive(Debug, Serialize)]
struct ApiRecommendation {
    symbol: String,
    tier: String,
    score: i32,
    score_delta: Option<i32>,
    evaluated_at: DateTime<Utc>,
    recommendation: Recommendation,
}

fn internal_error(e: anyhow::Error) -> StatusCode {
    sentry_anyhow::capture_anyhow(&e);
    tracing::error!(error = %format!("{e:#}"), "request failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn list_instruments(
    State(state): State<AppState>,
) -> Result<Json<Vec<SymbolSummary>>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let rows = storage::list_symbols(pool).await.map_err(internal_error)?;
    Ok(Json(rows))
}

async fn load_stored(state: &AppState, symbol: &str) -> Result<StoredHistory, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let stored = storage::load_history(pool, symbol)
        .await
        .map_err(internal_error)?;
    if stored.history.is_empty() {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(stored)
}

async fn get_latest(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiLatest>, StatusCode> {
    let stored = load_stored(&state, &symbol).await?;
    let (Some(header), Some(latest)) = (stored.header.clone(), stored.history.latest()) else {
        return Err(StatusCode::NOT_FOUND);
    };

    Ok(Json(ApiLatest {
        recommendation: recommendation(&stored.history, header.tier),
        result: latest.clone(),
        instrument: header,
    }))
}

async fn get_history(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiHistory>, StatusCode> {
    let stored = load_stored(&state, &symbol).await?;
    Ok(Json(ApiHistory {
        symbol: storage::results::normalize_symbol(&symbol),
        results: stored.history,
    }))
}

async fn get_recommendation(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiRecommendation>, StatusCode> {
    let stored = load_stored(&state, &symbol).await?;
    let (Some(header), Some(latest)) = (&stored.header, stored.history.latest()) else {
        return Err(StatusCode::NOT_FOUND);
    };

    Ok(Json(ApiRecommendation {
        symbol: header.symbol.clone(),
        tier: header.tier.to_string(),
        score: latest.score(),
        score_delta: stored.history.score_delta(),
        evaluated_at: latest.timestamp(),
        recommendation: recommendation(&stored.history, header.tier),
    }))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &levermann_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
