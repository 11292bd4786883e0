use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use rebac_engine::{ExpandTree, SubjectSet};

use crate::error::ApiError;
use crate::server::RebacServer;
use crate::types::TupleQueryParams;

/// Expand the subject set named by `namespace`, `object` and `relation`
pub async fn expand(
    State(server): State<RebacServer>,
    params: Result<Query<TupleQueryParams>, QueryRejection>,
) -> Result<Json<ExpandTree>, ApiError> {
    let Query(params) = params?;
    let set = SubjectSet::new(
        params.namespace.as_deref().unwrap_or_default(),
        params.object.as_deref().unwrap_or_default(),
        params.relation.as_deref().unwrap_or_default(),
    );
    let tree = server
        .engine
        .expand(&set, params.max_depth.unwrap_or(0))
        .await?;
    Ok(Json(tree))
}
