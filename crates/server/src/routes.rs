//! JSON API for line-item interpretation.
//!
//! - `POST /line-items` — create or update a job line item; on create,
//!   missing pricing fields are inferred from the description.
//!
//! Requests arrive already authenticated upstream; this layer only requires
//! that a bearer principal is present.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use linebook_core::domain::catalog::Unit;
use linebook_core::errors::{ApplicationError, InterfaceError};
use linebook_engine::{LineItemService, UpsertRequest};

#[derive(Clone)]
pub struct ApiState {
    service: Arc<LineItemService>,
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LineItemRequest {
    pub job_id: Option<String>,
    pub item_id: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub unit: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub finalize: Option<bool>,
    pub taxable: Option<bool>,
    // `null` clears the override; an absent field leaves it untouched.
    #[serde(default, deserialize_with = "double_option")]
    pub taxable_amount: Option<Option<Decimal>>,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<Decimal>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Decimal>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
pub struct UpsertResponse {
    pub ok: bool,
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(service: Arc<LineItemService>) -> Router {
    Router::new().route("/line-items", post(upsert_line_item)).with_state(ApiState { service })
}

fn require_principal(
    headers: &HeaderMap,
    correlation_id: &str,
) -> Result<(), (StatusCode, Json<ApiError>)> {
    let principal = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if principal.is_none() {
        warn!(
            event_name = "api.line_items.unauthorized",
            correlation_id,
            "request rejected: no bearer principal"
        );
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiError { error: "Unauthorized".to_string() }),
        ));
    }
    Ok(())
}

fn map_application_error(
    error: ApplicationError,
    correlation_id: &str,
) -> (StatusCode, Json<ApiError>) {
    let interface = error.into_interface(correlation_id);
    let (status, message) = match &interface {
        InterfaceError::BadRequest { message, .. } => (StatusCode::BAD_REQUEST, message.clone()),
        InterfaceError::Unauthorized { .. } => {
            (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
        }
        InterfaceError::ServiceUnavailable { message, .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, message.clone())
        }
        InterfaceError::Internal { message, .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, message.clone())
        }
    };

    if status.is_server_error() {
        tracing::error!(
            event_name = "api.line_items.failed",
            correlation_id,
            error = %interface,
            "upsert failed"
        );
    }
    (status, Json(ApiError { error: message }))
}

async fn upsert_line_item(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<LineItemRequest>,
) -> Result<Json<UpsertResponse>, (StatusCode, Json<ApiError>)> {
    let correlation_id = Uuid::new_v4().to_string();
    require_principal(&headers, &correlation_id)?;

    let unit = match body.unit.as_deref().map(str::parse::<Unit>).transpose() {
        Ok(unit) => unit,
        Err(error) => {
            return Err((StatusCode::BAD_REQUEST, Json(ApiError { error: error.to_string() })))
        }
    };

    let request = UpsertRequest {
        job_id: body.job_id.unwrap_or_default(),
        item_id: body.item_id,
        description: body.description,
        category_id: body.category_id,
        unit,
        quantity: body.quantity,
        unit_price: body.unit_price,
        finalize: body.finalize,
        taxable: body.taxable,
        taxable_amount: body.taxable_amount,
    };

    match state.service.upsert(request).await {
        Ok(outcome) => {
            info!(
                event_name = "api.line_items.upserted",
                correlation_id,
                line_item_id = %outcome.id.0,
                created = outcome.created,
                "line item upserted"
            );
            Ok(Json(UpsertResponse { ok: true, id: outcome.id.0 }))
        }
        Err(error) => Err(map_application_error(error, &correlation_id)),
    }
}
