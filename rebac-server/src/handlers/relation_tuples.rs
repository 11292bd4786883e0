//! Relation tuple handlers
//!
//! Write API:
//! - `PUT|POST /write/relation-tuples` inserts one tuple (idempotent)
//! - `DELETE /write/relation-tuples` deletes one tuple, given as body or query
//! - `PATCH /write/relation-tuples` applies insert/delete deltas atomically
//!
//! Read API:
//! - `GET /read/relation-tuples` lists tuples page by page

use axum::{
    extract::{rejection::{JsonRejection, QueryRejection}, Query, State},
    http::StatusCode,
    Json,
};
use rebac_engine::{PageRequest, RelationTuple, RelationTupleDelta, TuplePage};

use crate::error::ApiError;
use crate::server::RebacServer;
use crate::types::{PatchDeltaBody, RelationTupleBody, TupleQueryParams};

/// Insert a relation tuple
pub async fn create_relation_tuple(
    State(server): State<RebacServer>,
    body: Result<Json<RelationTupleBody>, JsonRejection>,
) -> Result<(StatusCode, Json<RelationTuple>), ApiError> {
    let Json(body) = body?;
    let tuple = RelationTuple::try_from(body)?;
    server.engine.write_tuple(tuple.clone()).await?;
    Ok((StatusCode::CREATED, Json(tuple)))
}

/// Delete a relation tuple; absent tuples are not an error.
///
/// Without a JSON content type the tuple is read from the query parameters.
pub async fn delete_relation_tuple(
    State(server): State<RebacServer>,
    params: Result<Query<TupleQueryParams>, QueryRejection>,
    body: Result<Json<RelationTupleBody>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Query(params) = params?;
    let body = match body {
        Ok(Json(body)) => Some(body),
        Err(JsonRejection::MissingJsonContentType(_)) => None,
        Err(rejection) => return Err(rejection.into()),
    };
    let tuple = match body {
        Some(body) if params.is_empty() => RelationTuple::try_from(body)?,
        Some(_) => {
            return Err(ApiError::validation(
                "pass the tuple either as JSON body or as query parameters, not both",
            ))
        }
        None => params.to_tuple()?,
    };
    server.engine.delete_tuple(&tuple).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Apply a batch of insert/delete deltas atomically
pub async fn patch_relation_tuples(
    State(server): State<RebacServer>,
    body: Result<Json<Vec<PatchDeltaBody>>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(body) = body?;
    let deltas = body
        .into_iter()
        .map(RelationTupleDelta::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    server.engine.patch(deltas).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List relation tuples matching the query filters
pub async fn list_relation_tuples(
    State(server): State<RebacServer>,
    params: Result<Query<TupleQueryParams>, QueryRejection>,
) -> Result<Json<TuplePage>, ApiError> {
    let Query(params) = params?;
    let query = params.to_query()?;
    let page = PageRequest {
        page_size: params.page_size.unwrap_or(0),
        page_token: params.page_token.clone().unwrap_or_default(),
    };
    let page = server.engine.read_tuples(&query, page).await?;
    Ok(Json(page))
}
