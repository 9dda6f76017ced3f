use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;

use admission_core::commands::{
    self, MajorMethodRequest, MajorRequest, PlanRequest, TrainingProgramRequest,
};
use admission_core::{AdmissionError, CatalogGateway, ErrorKind, PgCatalog};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pool: PgPool,
    catalog: Arc<dyn CatalogGateway>,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let catalog = Arc::new(PgCatalog::new(pool.clone()));
        Self { pool, catalog }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    body: serde_json::Value,
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::DuplicateName | ErrorKind::InUse => StatusCode::CONFLICT,
        ErrorKind::NotInScope | ErrorKind::PartialResolutionFailure => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<AdmissionError> for AppError {
    fn from(err: AdmissionError) -> Self {
        let kind = err.kind();
        if kind == ErrorKind::Internal {
            tracing::error!(error = %err, "command failed");
        } else {
            tracing::debug!(?kind, error = %err, "command rejected");
        }

        let mut body = serde_json::json!({ "error": err.to_string(), "kind": kind });
        if let AdmissionError::SubjectGroupNotFound { missing } = &err {
            body["missing"] = serde_json::json!(missing);
        }
        Self {
            status: status_for(kind),
            body,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

type ApiResult = Result<axum::response::Response, AppError>;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(pool: PgPool) -> Router {
    Router::new()
        .route("/api/plans", get(list_plans).post(add_plan))
        .route(
            "/api/plans/{plan_id}",
            get(get_plan).put(update_plan).delete(delete_plan),
        )
        .route(
            "/api/plans/{plan_id}/training-programs",
            post(add_training_program),
        )
        .route(
            "/api/plans/{plan_id}/training-programs/{id}",
            put(update_training_program).delete(delete_training_program),
        )
        .route("/api/plans/{plan_id}/majors", post(add_major))
        .route(
            "/api/plans/{plan_id}/majors/{id}",
            put(update_major).delete(delete_major),
        )
        .route(
            "/api/plans/{plan_id}/majors/{major_id}/methods",
            post(add_major_method),
        )
        .route(
            "/api/plans/{plan_id}/majors/{major_id}/methods/{id}",
            put(update_major_method).delete(delete_major_method),
        )
        .layer(CorsLayer::permissive())
        .with_state(AppState::new(pool))
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(pool: PgPool, bind: &str, port: u16) -> Result<()> {
    let app = build_router(pool);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("admission serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("admission serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C, shutting down");
    }
}

// ---------------------------------------------------------------------------
// Handlers: plans
// ---------------------------------------------------------------------------

async fn list_plans(State(state): State<AppState>) -> ApiResult {
    let plans = commands::list_plans(&state.pool).await?;
    Ok(Json(plans).into_response())
}

async fn add_plan(State(state): State<AppState>, Json(req): Json<PlanRequest>) -> ApiResult {
    let view = commands::add_plan(&state.pool, state.catalog.as_ref(), &req).await?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

async fn get_plan(State(state): State<AppState>, Path(plan_id): Path<i64>) -> ApiResult {
    let view = commands::get_plan(&state.pool, plan_id).await?;
    Ok(Json(view).into_response())
}

async fn update_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
    Json(req): Json<PlanRequest>,
) -> ApiResult {
    let view = commands::update_plan(&state.pool, state.catalog.as_ref(), plan_id, &req).await?;
    Ok(Json(view).into_response())
}

async fn delete_plan(State(state): State<AppState>, Path(plan_id): Path<i64>) -> ApiResult {
    commands::delete_plan(&state.pool, plan_id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ---------------------------------------------------------------------------
// Handlers: training programs
// ---------------------------------------------------------------------------

async fn add_training_program(
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
    Json(req): Json<TrainingProgramRequest>,
) -> ApiResult {
    let view =
        commands::add_training_program(&state.pool, state.catalog.as_ref(), plan_id, &req).await?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

async fn update_training_program(
    State(state): State<AppState>,
    Path((plan_id, id)): Path<(i64, i64)>,
    Json(req): Json<TrainingProgramRequest>,
) -> ApiResult {
    let view =
        commands::update_training_program(&state.pool, state.catalog.as_ref(), plan_id, id, &req)
            .await?;
    Ok(Json(view).into_response())
}

async fn delete_training_program(
    State(state): State<AppState>,
    Path((plan_id, id)): Path<(i64, i64)>,
) -> ApiResult {
    commands::delete_training_program(&state.pool, plan_id, id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ---------------------------------------------------------------------------
// Handlers: majors
// ---------------------------------------------------------------------------

async fn add_major(
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
    Json(req): Json<MajorRequest>,
) -> ApiResult {
    let view = commands::add_major(&state.pool, state.catalog.as_ref(), plan_id, &req).await?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

async fn update_major(
    State(state): State<AppState>,
    Path((plan_id, id)): Path<(i64, i64)>,
    Json(req): Json<MajorRequest>,
) -> ApiResult {
    let view =
        commands::update_major(&state.pool, state.catalog.as_ref(), plan_id, id, &req).await?;
    Ok(Json(view).into_response())
}

async fn delete_major(
    State(state): State<AppState>,
    Path((plan_id, id)): Path<(i64, i64)>,
) -> ApiResult {
    commands::delete_major(&state.pool, plan_id, id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ---------------------------------------------------------------------------
// Handlers: major methods
// ---------------------------------------------------------------------------

async fn add_major_method(
    State(state): State<AppState>,
    Path((plan_id, major_id)): Path<(i64, i64)>,
    Json(req): Json<MajorMethodRequest>,
) -> ApiResult {
    let view =
        commands::add_major_method(&state.pool, state.catalog.as_ref(), plan_id, major_id, &req)
            .await?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

async fn update_major_method(
    State(state): State<AppState>,
    Path((plan_id, major_id, id)): Path<(i64, i64, i64)>,
    Json(req): Json<MajorMethodRequest>,
) -> ApiResult {
    let view = commands::update_major_method(
        &state.pool,
        state.catalog.as_ref(),
        plan_id,
        major_id,
        id,
        &req,
    )
    .await?;
    Ok(Json(view).into_response())
}

async fn delete_major_method(
    State(state): State<AppState>,
    Path((plan_id, major_id, id)): Path<(i64, i64, i64)>,
) -> ApiResult {
    commands::delete_major_method(&state.pool, plan_id, major_id, id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
