use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::StoreError;
use crate::payout::{normalize_address, short_address};
use crate::state::SharedState;
use crate::store::RewardClaim;


#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub(super) enum ClaimError {
    #[schema(example = "Missing parameters")]
    BadRequest(String),
    #[schema(example = "No submission found")]
    NotFound(String),
    #[schema(example = "All rewards have been claimed")]
    Conflict(String),
    #[schema(example = "No session key found for campaign")]
    Internal(String),
}

impl IntoResponse for ClaimError {
    fn into_response(self) -> Response {
        let status = match &self {
            ClaimError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ClaimError::NotFound(_) => StatusCode::NOT_FOUND,
            ClaimError::Conflict(_) => StatusCode::CONFLICT,
            ClaimError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

impl From<StoreError> for ClaimError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "reward store failure");
        ClaimError::Internal("Internal server error".to_string())
    }
}

#[derive(Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub(super) struct ClaimRewardPayload {
    #[schema(example = "summer-drop")]
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[schema(example = "0x52908400098527886e0f7030069857d2e4169ee7")]
    #[serde(default)]
    pub wallet_address: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(super) struct ClaimRewardResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "0.1")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn already_paid(amount: Option<String>) -> ClaimRewardResult {
    ClaimRewardResult {
        success: false,
        tx_hash: None,
        amount,
        message: Some("Reward already paid".to_string()),
    }
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[utoipa::path(
    post,
    path = "/api/claim-reward",
    request_body = ClaimRewardPayload,
    responses(
        (status = 200, description = "Reward paid, or it had already been paid", body = ClaimRewardResult),
        (status = 400, description = "Missing parameters, or not an instant reward campaign", body = ClaimError),
        (status = 404, description = "Campaign or submission not found", body = ClaimError),
        (status = 409, description = "Every winner slot has been paid", body = ClaimError),
        (status = 500, description = "No session key, or the payout failed", body = ClaimError)
    )
)]
#[axum::debug_handler]
pub(super) async fn claim_reward(
    State(state): State<SharedState>,
    Json(payload): Json<ClaimRewardPayload>,
) -> Result<Json<ClaimRewardResult>, ClaimError> {
    let (campaign_id, wallet_address) =
        match (required(payload.campaign_id), required(payload.wallet_address)) {
            (Some(campaign_id), Some(wallet)) => (campaign_id, normalize_address(&wallet)),
            _ => return Err(ClaimError::BadRequest("Missing parameters".to_string())),
        };

    let campaign = state
        .store
        .get_campaign(&campaign_id)
        .await?
        .ok_or_else(|| ClaimError::NotFound("Campaign not found".to_string()))?;

    let reward = campaign
        .instant()
        .ok_or_else(|| ClaimError::BadRequest("Not an instant reward campaign".to_string()))?;

    let participant = state
        .store
        .get_participant(&campaign_id, &wallet_address)
        .await?
        .ok_or_else(|| ClaimError::NotFound("No submission found".to_string()))?;

    if participant.reward_paid {
        return Ok(Json(already_paid(participant.reward_amount)));
    }

    let session_key = campaign
        .session_private_key
        .as_deref()
        .ok_or_else(|| ClaimError::Internal("No session key found for campaign".to_string()))?;

    let reserved = state
        .store
        .reserve_reward(
            participant.id,
            &campaign_id,
            &reward.amount_per_winner,
            reward.number_of_winners,
        )
        .await?;

    match reserved {
        RewardClaim::Reserved(_) => {}
        RewardClaim::AlreadyPaid => return Ok(Json(already_paid(participant.reward_amount))),
        RewardClaim::Exhausted => {
            return Err(ClaimError::Conflict(
                "All rewards have been claimed".to_string(),
            ))
        }
    }

    tracing::info!(
        campaign = %campaign_id,
        wallet = %short_address(&wallet_address),
        amount = %reward.amount_per_winner,
        "processing payout"
    );

    let receipt = match state
        .payout
        .send(session_key, &wallet_address, &reward.amount_per_winner)
        .await
    {
        Ok(receipt) => receipt,
        Err(e) => {
            tracing::error!(campaign = %campaign_id, error = %e, "payout failed");

            if let Err(err) = state.store.release_reward(participant.id).await {
                tracing::error!(
                    campaign = %campaign_id,
                    wallet = %short_address(&wallet_address),
                    error = %err,
                    "reward stays reserved after a failed payout"
                );
            }

            return Err(ClaimError::Internal(format!("Payout failed: {}", e)));
        }
    };

    tracing::info!(campaign = %campaign_id, tx_hash = %receipt.tx_hash, "reward paid");

    Ok(Json(ClaimRewardResult {
        success: true,
        tx_hash: Some(receipt.tx_hash),
        amount: Some(reward.amount_per_winner.clone()),
        message: None,
    }))
}
