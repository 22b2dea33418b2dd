use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use hyper::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::campaign::{CampaignView, OwnerQuery};
use crate::error::StoreError;
use crate::payout::normalize_address;
use crate::state::SharedState;
use crate::types::{Campaign, CampaignStatus};


#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub(super) enum DashboardError {
    #[schema(example = "Internal server error")]
    Internal(String),
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

impl From<StoreError> for DashboardError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "dashboard store failure");
        DashboardError::Internal("Internal server error".to_string())
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(super) struct DashboardStats {
    pub clicks: i64,
    pub joined: i64,
    /// joined / clicks as a percentage, one decimal place
    #[schema(example = 12.5)]
    pub conversion: f64,
    pub active_campaigns: usize,
    /// Sum of the campaigns' prize pools
    #[schema(value_type = String, example = "3.5")]
    pub total_prize_pool: Decimal,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub(super) struct DashboardResult {
    pub stats: DashboardStats,
    pub campaigns: Vec<CampaignView>,
}

pub(super) fn summarize(campaigns: &[CampaignView]) -> DashboardStats {
    let clicks: i64 = campaigns.iter().map(|c| c.clicks).sum();
    let joined: i64 = campaigns.iter().map(|c| c.joined).sum();

    let conversion = if clicks > 0 {
        (joined as f64 / clicks as f64 * 1000.0).round() / 10.0
    } else {
        0.0
    };

    DashboardStats {
        clicks,
        joined,
        conversion,
        active_campaigns: campaigns
            .iter()
            .filter(|c| c.status == CampaignStatus::Active)
            .count(),
        total_prize_pool: campaigns
            .iter()
            .fold(Decimal::ZERO, |total, c| total.saturating_add(c.prize_pool)),
    }
}

pub(super) fn build_dashboard(
    campaigns: Vec<Campaign>,
    now: DateTime<Utc>,
) -> DashboardResult {
    let campaigns: Vec<CampaignView> = campaigns
        .into_iter()
        .map(|c| CampaignView::new(c, now))
        .collect();

    DashboardResult {
        stats: summarize(&campaigns),
        campaigns,
    }
}

#[utoipa::path(
    get,
    path = "/dashboard",
    params(OwnerQuery),
    responses(
        (status = 200, description = "Aggregated stats over the owner's campaigns", body = DashboardResult),
        (status = 500, description = "Store failure", body = DashboardError)
    )
)]
pub(super) async fn get_dashboard(
    Query(query): Query<OwnerQuery>,
    State(state): State<SharedState>,
) -> Result<Json<DashboardResult>, DashboardError> {
    let owner = normalize_address(&query.owner);

    let campaigns = state.store.list_campaigns_by_owner(&owner).await?;

    Ok(Json(build_dashboard(campaigns, Utc::now())))
}
