//! Read API: permission checks
//!
//! `/read/check` answers 200 `{"allowed": true}` or 403 `{"allowed": false}`.
//! Callers treat the 403 as a denial, never as a failed request.
//! `/read/check/openapi` carries the same body but always answers 200.

use axum::{
    extract::{rejection::{JsonRejection, QueryRejection}, Query, State},
    http::StatusCode,
    Json,
};
use rebac_engine::{CheckRequest, CheckResponse};

use crate::error::ApiError;
use crate::server::RebacServer;
use crate::types::{CheckBody, TupleQueryParams};

/// Check via query parameters, mirroring denial as 403
pub async fn get_check(
    State(server): State<RebacServer>,
    params: Result<Query<TupleQueryParams>, QueryRejection>,
) -> Result<(StatusCode, Json<CheckResponse>), ApiError> {
    let Query(params) = params?;
    let request = params.to_check_request()?;
    run_check(&server, &request).await.map(with_denial_status)
}

/// Check via JSON body, mirroring denial as 403
pub async fn post_check(
    State(server): State<RebacServer>,
    params: Result<Query<TupleQueryParams>, QueryRejection>,
    body: Result<Json<CheckBody>, JsonRejection>,
) -> Result<(StatusCode, Json<CheckResponse>), ApiError> {
    let request = body_request(params, body)?;
    run_check(&server, &request).await.map(with_denial_status)
}

/// Check via query parameters, always answering 200
pub async fn get_check_openapi(
    State(server): State<RebacServer>,
    params: Result<Query<TupleQueryParams>, QueryRejection>,
) -> Result<Json<CheckResponse>, ApiError> {
    let Query(params) = params?;
    let request = params.to_check_request()?;
    run_check(&server, &request).await.map(Json)
}

/// Check via JSON body, always answering 200
pub async fn post_check_openapi(
    State(server): State<RebacServer>,
    params: Result<Query<TupleQueryParams>, QueryRejection>,
    body: Result<Json<CheckBody>, JsonRejection>,
) -> Result<Json<CheckResponse>, ApiError> {
    let request = body_request(params, body)?;
    run_check(&server, &request).await.map(Json)
}

fn body_request(
    params: Result<Query<TupleQueryParams>, QueryRejection>,
    body: Result<Json<CheckBody>, JsonRejection>,
) -> Result<CheckRequest, ApiError> {
    let Query(params) = params?;
    let Json(body) = body?;
    let mut request = CheckRequest::try_from(body)?;
    // `max-depth` may arrive as a query parameter as well
    if request.max_depth == 0 {
        request.max_depth = params.max_depth.unwrap_or(0);
    }
    Ok(request)
}

async fn run_check(server: &RebacServer, request: &CheckRequest) -> Result<CheckResponse, ApiError> {
    let allowed = server.engine.check_request(request).await?;
    Ok(CheckResponse { allowed })
}

fn with_denial_status(response: CheckResponse) -> (StatusCode, Json<CheckResponse>) {
    let status = if response.allowed {
        StatusCode::OK
    } else {
        StatusCode::FORBIDDEN
    };
    (status, Json(response))
}
