//! Fetch and Location Trigger Routes
//!
//! One-shot, user-triggered requests. Unlike periodic jobs, these
//! propagate the terminal error of the cycle to the HTTP caller.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use fetch_coordinator::FetchOutcome;
use readings::{FetchJob, Location, SourceKind};
use serde::Serialize;
use std::sync::Arc;

use crate::{error_status, AppState};

/// Response for a completed fetch trigger
#[derive(Debug, Serialize)]
pub struct FetchResponse {
    pub source: SourceKind,
    pub status: &'static str,
    pub inserted: usize,
}

/// Trigger a one-shot fetch for a source.
pub async fn request_fetch(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
) -> impl IntoResponse {
    let source: SourceKind = match source.parse() {
        Ok(source) => source,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let job = FetchJob::one_shot(source, state.fetch_timeout);
    match state.coordinator.execute(job).await {
        Ok(FetchOutcome::Committed(inserted)) => Json(FetchResponse {
            source,
            status: "committed",
            inserted,
        })
        .into_response(),
        // Dropped duplicate: a defined no-op, reported as accepted.
        Ok(FetchOutcome::AlreadyInFlight) => (
            StatusCode::ACCEPTED,
            Json(FetchResponse {
                source,
                status: "already-in-flight",
                inserted: 0,
            }),
        )
            .into_response(),
        Err(e) => (error_status(&e), e.to_string()).into_response(),
    }
}

/// Response for a completed location refresh
#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub location: Location,
}

/// Trigger a geoposition refresh of the home location.
pub async fn request_location_refresh(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.coordinator.refresh_location().await {
        Ok(location) => Json(LocationResponse { location }).into_response(),
        Err(e) => (error_status(&e), e.to_string()).into_response(),
    }
}
