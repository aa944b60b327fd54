use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cardgenie_core::catalog::Catalog;
use cardgenie_core::comparison::{self, ComparisonViewModel};
use cardgenie_core::domain::card::CardRecord;
use cardgenie_core::domain::profile::{parse_monthly_income, UserProfile};
use cardgenie_core::filter::{self, CardFilter, DirectoryEntry};
use cardgenie_core::oracle::gemini::GeminiClient;
use cardgenie_core::orchestrator::{RecommendationOrchestrator, RequestState};
use cardgenie_core::selection::{SelectionSet, ToggleOutcome};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = cardgenie_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let catalog = Arc::new(Catalog::from_settings(&settings)?);
    tracing::info!(
        version = catalog.version(),
        cards_len = catalog.len(),
        "card catalog ready"
    );

    let orchestrator = match GeminiClient::from_settings(&settings) {
        Ok(client) => {
            tracing::info!(model = client.model(), "recommendation oracle configured");
            RecommendationOrchestrator::new(catalog, Arc::new(client))
        }
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::warn!(error = %e, "recommendation oracle unavailable; AI requests will fail");
            RecommendationOrchestrator::unconfigured(catalog)
        }
    };

    let app = router(AppState::new(orchestrator));

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
        .route("/cards", get(list_cards))
        .route("/cards/:id", get(get_card))
        .route("/selection", get(get_selection).delete(clear_selection))
        .route("/selection/:card_id", post(toggle_selection))
        .route(
            "/recommendations",
            post(request_recommendations).get(get_recommendations),
        )
        .route("/comparison", get(get_comparison).delete(clear_selection))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

/// One comparison session per process.
#[derive(Clone)]
struct AppState {
    orchestrator: RecommendationOrchestrator,
    selection: Arc<Mutex<SelectionSet>>,
}

impl AppState {
    fn new(orchestrator: RecommendationOrchestrator) -> Self {
        Self {
            orchestrator,
            selection: Arc::default(),
        }
    }

    fn catalog(&self) -> &Catalog {
        self.orchestrator.catalog()
    }

    fn selection(&self) -> MutexGuard<'_, SelectionSet> {
        self.selection.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

type ApiError = (StatusCode, Json<ErrorBody>);

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

#[derive(Debug, Deserialize)]
struct CardsQuery {
    filter: Option<String>,
    q: Option<String>,
}

async fn list_cards(
    State(state): State<AppState>,
    Query(query): Query<CardsQuery>,
) -> Result<Json<Vec<DirectoryEntry>>, ApiError> {
    let active_filter = match query.filter.as_deref() {
        Some(f) => f
            .parse::<CardFilter>()
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?,
        None => CardFilter::All,
    };
    let search = query.q.unwrap_or_default();

    let selection = state.selection();
    Ok(Json(filter::directory_entries(
        state.catalog().cards(),
        active_filter,
        &search,
        &selection,
    )))
}

async fn get_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CardRecord>, StatusCode> {
    state
        .catalog()
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SelectionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<ToggleOutcome>,
    card_ids: Vec<String>,
    limit_reached: bool,
}

impl SelectionResponse {
    fn new(outcome: Option<ToggleOutcome>, selection: &SelectionSet) -> Self {
        Self {
            outcome,
            card_ids: selection.cards().iter().map(|c| c.id.clone()).collect(),
            limit_reached: selection.is_full(),
        }
    }
}

async fn get_selection(State(state): State<AppState>) -> Json<SelectionResponse> {
    Json(SelectionResponse::new(None, &state.selection()))
}

async fn toggle_selection(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
) -> Result<Json<SelectionResponse>, StatusCode> {
    let card = state
        .catalog()
        .get(&card_id)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)?;

    let mut selection = state.selection();
    let outcome = selection.toggle(&card);
    tracing::debug!(%card_id, ?outcome, selected = selection.len(), "selection toggled");
    Ok(Json(SelectionResponse::new(Some(outcome), &selection)))
}

async fn clear_selection(State(state): State<AppState>) -> StatusCode {
    state.selection().clear();
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IncomeInput {
    Number(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileRequest {
    monthly_income: IncomeInput,
    #[serde(default)]
    spending_categories: Vec<String>,
    #[serde(default)]
    desired_benefits: Vec<String>,
}

impl ProfileRequest {
    fn into_profile(self) -> anyhow::Result<UserProfile> {
        let income = match self.monthly_income {
            IncomeInput::Number(n) => n,
            IncomeInput::Text(s) => parse_monthly_income(&s)?,
        };
        UserProfile::try_new(income, self.spending_categories, self.desired_benefits)
    }
}

async fn request_recommendations(
    State(state): State<AppState>,
    Json(req): Json<ProfileRequest>,
) -> Result<(StatusCode, Json<RequestState>), ApiError> {
    let profile = req
        .into_profile()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("{e:#}")))?;

    tokio::spawn(state.orchestrator.request_recommendations(profile));

    Ok((StatusCode::ACCEPTED, Json(state.orchestrator.state())))
}

async fn get_recommendations(State(state): State<AppState>) -> Json<RequestState> {
    Json(state.orchestrator.state())
}

async fn get_comparison(State(state): State<AppState>) -> Json<ComparisonViewModel> {
    let request_state = state.orchestrator.state();
    let selection = state.selection();
    Json(comparison::assemble(&request_state, &selection))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &cardgenie_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
