//! Public roster route.

use axum::{Json, extract::State};
use chrono::Local;
use serde::{Deserialize, Serialize};

use pharmaguard_core::WeekSchedule;

use crate::error::Result;
use crate::state::AppState;

/// Roster listing.
///
/// `active_index` is `null` when no week covers the current day.
#[derive(Debug, Serialize, Deserialize)]
pub struct RosterResponse {
    pub weeks: Vec<WeekSchedule>,
    pub active_index: Option<usize>,
}

/// All weeks with the index of the one active now, server local time.
#[tracing::instrument(skip(state))]
pub async fn show(State(state): State<AppState>) -> Result<Json<RosterResponse>> {
    let weeks = state.roster().weeks().await?;
    let active_index = state
        .roster()
        .active_index(&weeks, Local::now().naive_local());

    Ok(Json(RosterResponse {
        weeks: weeks.as_ref().clone(),
        active_index,
    }))
}
