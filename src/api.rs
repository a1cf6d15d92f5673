//! HTTP API поверх [`Allocator`]
//!
//! Все маршруты доступны и от корня, и под `/api`. Ошибки ввода и отказы
//! аллокатора возвращаются телом `{"success": false, "message": ...}`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::debug;

use crate::resources::HospitalId;
use crate::{AllocError, Allocator};

pub fn router(allocator: Allocator) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(Any);

    Router::new()
        .merge(routes())
        .nest("/api", routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(allocator)
}

fn routes() -> Router<Allocator> {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/hospitals", get(hospitals))
        .route("/hospital", post(register_hospital))
        .route("/request", post(submit_request))
        .route("/allocate", post(allocate))
        .route("/replenish", post(replenish))
        .route("/metrics", get(metrics))
        .route("/metrics/reset", post(reset_metrics))
}

impl IntoResponse for AllocError {
    fn into_response(self) -> Response {
        let status = match &self {
            AllocError::UnknownHospital(_) => StatusCode::NOT_FOUND,
            AllocError::DuplicateHospital(_) => StatusCode::CONFLICT,
            AllocError::InsufficientInventory { .. } => StatusCode::CONFLICT,
            AllocError::PolicyUnknown(_) | AllocError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AllocError::Config(_) | AllocError::ConfigParse(_) | AllocError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        debug!("Запрос отклонен: {}", self);
        (
            status,
            Json(json!({ "success": false, "message": self.to_string() })),
        )
            .into_response()
    }
}

type ApiResult = Result<Response, AllocError>;

fn success(extra: Value) -> Response {
    let mut body = json!({ "success": true });
    if let (Some(fields), Value::Object(extra)) = (body.as_object_mut(), extra) {
        fields.extend(extra);
    }
    Json(body).into_response()
}

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AllocError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AllocError::invalid(rejection.body_text()))
}

fn positive(value: Option<i64>, field: &str) -> Result<u64, AllocError> {
    match value {
        Some(v) if v > 0 => Ok(v as u64),
        Some(v) => Err(AllocError::invalid(format!("{} must be positive, got {}", field, v))),
        None => Err(AllocError::invalid(format!("{} is required", field))),
    }
}

fn parse_hospital_id(value: Option<i64>, field: &str) -> Result<HospitalId, AllocError> {
    let id = positive(value, field)?;
    HospitalId::try_from(id).map_err(|_| AllocError::invalid(format!("{} is out of range", field)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestBody {
    hospital_id: Option<i64>,
    amount: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AllocateBody {
    algorithm: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplenishBody {
    amount: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HospitalBody {
    id: Option<i64>,
    name: Option<String>,
    priority: Option<i32>,
    high_risk_population: Option<i64>,
}

async fn health() -> &'static str {
    "OK"
}

async fn status(State(allocator): State<Allocator>) -> Response {
    Json(allocator.status().await).into_response()
}

async fn hospitals(State(allocator): State<Allocator>) -> Response {
    Json(json!({ "hospitals": allocator.hospitals().await })).into_response()
}

async fn submit_request(
    State(allocator): State<Allocator>,
    payload: Result<Json<RequestBody>, JsonRejection>,
) -> ApiResult {
    let request = parse_body(payload)?;
    let hospital_id = parse_hospital_id(request.hospital_id, "hospitalId")?;
    let amount = positive(request.amount, "amount")?;

    let pending = allocator.submit_request(hospital_id, amount).await?;
    Ok(success(json!({
        "message": "Request added successfully",
        "requestedVaccines": pending.amount,
    })))
}

async fn allocate(
    State(allocator): State<Allocator>,
    payload: Result<Json<AllocateBody>, JsonRejection>,
) -> ApiResult {
    let request = parse_body(payload)?;
    let algorithm = request
        .algorithm
        .ok_or_else(|| AllocError::invalid("algorithm is required"))?;

    let allocations = allocator.allocate(&algorithm).await?;
    Ok(success(json!({
        "message": "Allocation processed",
        "allocations": allocations,
    })))
}

async fn replenish(
    State(allocator): State<Allocator>,
    payload: Result<Json<ReplenishBody>, JsonRejection>,
) -> ApiResult {
    let request = parse_body(payload)?;
    let amount = positive(request.amount, "amount")?;

    let inventory = allocator.replenish(amount).await?;
    Ok(success(json!({
        "totalVaccines": inventory.total_vaccines,
        "availableVaccines": inventory.available_vaccines,
    })))
}

async fn register_hospital(
    State(allocator): State<Allocator>,
    payload: Result<Json<HospitalBody>, JsonRejection>,
) -> ApiResult {
    let request = parse_body(payload)?;
    let id = parse_hospital_id(request.id, "id")?;
    let name = request
        .name
        .ok_or_else(|| AllocError::invalid("name is required"))?;
    let priority = request
        .priority
        .ok_or_else(|| AllocError::invalid("priority is required"))?;
    let high_risk_population = match request.high_risk_population {
        Some(v) if v < 0 => {
            return Err(AllocError::invalid("highRiskPopulation must not be negative"))
        }
        Some(v) => v as u64,
        None => 0,
    };

    allocator
        .register_hospital(id, &name, priority, high_risk_population)
        .await?;
    Ok(success(json!({ "message": "Hospital added" })))
}

async fn metrics(State(allocator): State<Allocator>) -> Response {
    Json(allocator.metrics().await).into_response()
}

async fn reset_metrics(State(allocator): State<Allocator>) -> Response {
    allocator.reset_metrics().await;
    success(json!({}))
}
