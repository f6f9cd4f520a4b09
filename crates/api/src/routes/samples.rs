//! Sample Query Routes

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use readings::{Sample, SourceKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;

/// Query parameters for the samples endpoint
#[derive(Debug, Deserialize)]
pub struct SampleQuery {
    /// Maximum number of records to return
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

/// Response for the samples endpoint
#[derive(Debug, Serialize)]
pub struct SampleResponse {
    pub data: Vec<Sample>,
    pub meta: SampleMeta,
}

#[derive(Debug, Serialize)]
pub struct SampleMeta {
    pub source: SourceKind,
    pub count: usize,
    pub limit: usize,
}

/// Latest samples for a source, most recent insertion first.
pub async fn get_latest(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
    Query(params): Query<SampleQuery>,
) -> impl IntoResponse {
    let source: SourceKind = match source.parse() {
        Ok(source) => source,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };
    let limit = params.limit.min(1000);

    match state.store.query_latest(source, limit).await {
        Ok(data) => Json(SampleResponse {
            meta: SampleMeta {
                source,
                count: data.len(),
                limit,
            },
            data,
        })
        .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
