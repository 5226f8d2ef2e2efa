//! HTTP surface.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use fxledger_common::{
    parse_range_bound, CanonicalRate, ConversionFilter, ConversionRecord, ConversionRequest,
    ConversionResponse, CurrencyCode, RangeBound, RateQuote, ServiceError, ServiceMode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::metrics::MetricsSnapshot;
use crate::refresh::RefreshStatus;
use crate::service::CurrencyService;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    service: Arc<CurrencyService>,
}

/// Build the router.
pub fn router(service: Arc<CurrencyService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/currency/rates", get(list_rates))
        .route("/currency/rate/{code}", get(get_rate))
        .route("/currency/convert", post(convert))
        .route("/currency/conversions", get(conversions))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// A service error paired with the status it is reported with.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    code: &'static str,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: message.into(),
            code: "NOT_FOUND",
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            ServiceError::HistoryDisabled => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %err, code = err.error_code(), "Request failed");
        }

        Self {
            status,
            error: err.to_string(),
            code: err.error_code(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: rejection.body_text(),
            code: "INVALID_REQUEST",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.error,
            code: self.code.to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub mode: ServiceMode,
    pub refresh: RefreshStatus,
    pub metrics: MetricsSnapshot,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        mode: state.service.mode(),
        refresh: state.service.refresher().status(),
        metrics: state.service.metrics().snapshot(),
    })
}

async fn list_rates(State(state): State<AppState>) -> ApiResult<Vec<CanonicalRate>> {
    Ok(Json(state.service.refresh_and_list().await?))
}

async fn get_rate(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<RateQuote> {
    match state.service.get_rate(&code).await {
        Ok(quote) => Ok(Json(quote)),
        Err(ServiceError::UnknownCurrencyCode(code)) => {
            Err(ApiError::not_found(format!("No rate for currency code {code}")))
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertBody {
    pub from_currency_code: String,
    pub to_currency_code: String,
    pub amount: Decimal,
}

async fn convert(
    State(state): State<AppState>,
    body: Result<Json<ConvertBody>, JsonRejection>,
) -> ApiResult<ConversionResponse> {
    let Json(body) = body?;
    let request =
        ConversionRequest::parse(&body.from_currency_code, &body.to_currency_code, body.amount)?;
    Ok(Json(state.service.convert(request).await?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionsQuery {
    pub from_currency: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl ConversionsQuery {
    fn into_filter(self) -> Result<ConversionFilter, ServiceError> {
        let from_currency = non_empty(self.from_currency)
            .map(|code| {
                CurrencyCode::parse(&code)
                    .map_err(|e| ServiceError::invalid_field(e.to_string(), "fromCurrency"))
            })
            .transpose()?;
        let start = non_empty(self.start_date)
            .map(|v| parse_range_bound(&v, RangeBound::Start, "startDate"))
            .transpose()?;
        let end = non_empty(self.end_date)
            .map(|v| parse_range_bound(&v, RangeBound::End, "endDate"))
            .transpose()?;

        Ok(ConversionFilter {
            from_currency,
            start,
            end,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

async fn conversions(
    State(state): State<AppState>,
    Query(query): Query<ConversionsQuery>,
) -> ApiResult<Vec<ConversionRecord>> {
    let filter = query.into_filter()?;
    let records = state.service.conversions(filter).await?;

    if records.is_empty() {
        return Err(ApiError::not_found("No conversions match the given filter"));
    }
    Ok(Json(records))
}
