//! Response envelope for the status API.
//!
//! Every body is `{ "data" | "error": ..., "meta": { ... } }`. `meta.cycle`
//! names the published cycle a response was served from, so dashboards can
//! tell a fresh report from a repeated one.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub const API_VERSION: &str = "1";

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
    /// Cycle the data came from; absent for live analyses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle: Option<u64>,
}

impl ResponseMeta {
    fn now(cycle: Option<u64>) -> Self {
        Self {
            timestamp: Utc::now(),
            version: API_VERSION,
            cycle,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    /// Live data computed for this request.
    pub fn ok(data: T) -> Response {
        Self::build(data, None)
    }

    /// Data taken from published cycle `cycle`.
    pub fn from_cycle(data: T, cycle: u64) -> Response {
        Self::build(data, Some(cycle))
    }

    fn build(data: T, cycle: Option<u64>) -> Response {
        let body = Self {
            data,
            meta: ResponseMeta::now(cycle),
        };
        (StatusCode::OK, axum::Json(body)).into_response()
    }
}

/// Reasons a status request cannot be answered.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No analysis cycle has completed yet")]
    NoReport,

    #[error("No qualifying sensors for machine '{0}'")]
    UnknownMachine(String),

    #[error("Sensor '{0}' has no operational limit")]
    NoLimit(String),

    #[error("Sensor '{0}' has insufficient data")]
    InsufficientData(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoReport => StatusCode::SERVICE_UNAVAILABLE,
            Self::UnknownMachine(_) | Self::NoLimit(_) | Self::InsufficientData(_) => {
                StatusCode::NOT_FOUND
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NoReport => "NO_REPORT",
            Self::UnknownMachine(_) => "UNKNOWN_MACHINE",
            Self::NoLimit(_) => "NO_LIMIT",
            Self::InsufficientData(_) => "INSUFFICIENT_DATA",
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
    meta: ResponseMeta,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message: self.to_string(),
            },
            meta: ResponseMeta::now(None),
        };
        (self.status(), axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn cycle_data_is_tagged_with_its_cycle() {
        let resp = ApiResponse::from_cycle(serde_json::json!({"machines": 2}), 4);
        assert_eq!(resp.status(), StatusCode::OK);

        let v = json(resp).await;
        assert_eq!(v["data"]["machines"], 2);
        assert_eq!(v["meta"]["version"], API_VERSION);
        assert_eq!(v["meta"]["cycle"], 4);
    }

    #[tokio::test]
    async fn live_data_has_no_cycle() {
        let v = json(ApiResponse::ok("up")).await;
        assert!(v["meta"].get("cycle").is_none());
        assert!(v["meta"]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn errors_map_to_status_and_code() {
        let resp = ApiError::NoLimit("GTM2:Spare".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let v = json(resp).await;
        assert_eq!(v["error"]["code"], "NO_LIMIT");
        assert_eq!(v["error"]["message"], "Sensor 'GTM2:Spare' has no operational limit");

        assert_eq!(ApiError::NoReport.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
