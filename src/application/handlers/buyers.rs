use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use crate::application::errors::ServiceResult;
use crate::application::services::catalog::{BuyerInput, InterestRateSetting};
use crate::application::state::AppState;
use crate::auth::CurrentUser;
use crate::persistence::models::{BuyerRecord, DashboardStats};

#[derive(Debug, Deserialize)]
pub struct InterestRateRequest {
    pub daily_interest_rate: f64,
}

pub async fn list_buyers(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ServiceResult<Json<Vec<BuyerRecord>>> {
    Ok(Json(state.catalog.list_buyers(&user.id).await?))
}

pub async fn create_buyer(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<BuyerInput>,
) -> ServiceResult<(StatusCode, Json<BuyerRecord>)> {
    let buyer = state.catalog.create_buyer(&user.id, input).await?;
    Ok((StatusCode::CREATED, Json(buyer)))
}

pub async fn get_buyer(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ServiceResult<Json<BuyerRecord>> {
    Ok(Json(state.catalog.get_buyer(&user.id, &id).await?))
}

pub async fn update_buyer(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(input): Json<BuyerInput>,
) -> ServiceResult<Json<BuyerRecord>> {
    Ok(Json(state.catalog.update_buyer(&user.id, &id, input).await?))
}

pub async fn dashboard_stats(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ServiceResult<Json<DashboardStats>> {
    Ok(Json(state.catalog.dashboard_stats(&user.id).await?))
}

pub async fn get_interest_rate(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ServiceResult<Json<InterestRateSetting>> {
    Ok(Json(state.catalog.interest_rate(&user.id).await?))
}

pub async fn set_interest_rate(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<InterestRateRequest>,
) -> ServiceResult<Json<InterestRateSetting>> {
    Ok(Json(
        state
            .catalog
            .set_interest_rate(&user.id, request.daily_interest_rate)
            .await?,
    ))
}
