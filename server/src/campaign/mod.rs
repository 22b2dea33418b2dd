use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use hyper::StatusCode;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::StoreError;
use crate::payout::{
    is_session_key, is_wallet_address, normalize_address, parse_amount, parse_ether, PayoutError,
};
use crate::state::SharedState;
use crate::types::{
    Campaign, CampaignStatus, InstantReward, PermissionContext, PrizeTier, RewardType, Task,
    TaskType,
};

pub use timing::{derive_status, TimeRemaining};
use timing::time_remaining;

mod slug;
mod test;
mod timing;

const UNTITLED_ROOM: &str = "Untitled Room";
const PRIZE_TYPE: &str = "ETH";

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub(super) enum CampaignError {
    #[schema(example = "Campaign must end after it starts")]
    BadRequest(String),
    #[schema(example = "Only the campaign owner can delete it")]
    Forbidden(String),
    #[schema(example = "Campaign summer-drop doesn't exist")]
    NotFound(String),
    #[schema(example = "Campaign id summer-drop is already taken")]
    Conflict(String),
    #[schema(example = "Internal server error")]
    Internal(String),
}

impl IntoResponse for CampaignError {
    fn into_response(self) -> Response {
        let status = match &self {
            CampaignError::BadRequest(_) => StatusCode::BAD_REQUEST,
            CampaignError::Forbidden(_) => StatusCode::FORBIDDEN,
            CampaignError::NotFound(_) => StatusCode::NOT_FOUND,
            CampaignError::Conflict(_) => StatusCode::CONFLICT,
            CampaignError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

impl From<StoreError> for CampaignError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => {
                CampaignError::Conflict(format!("{} is already taken", what))
            }
            other => {
                tracing::error!(error = %other, "campaign store failure");
                CampaignError::Internal("Internal server error".to_string())
            }
        }
    }
}

fn not_found(id: &str) -> CampaignError {
    CampaignError::NotFound(format!("Campaign {} doesn't exist", id))
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(super) struct OwnerQuery {
    /// Wallet address of the campaign owner
    pub owner: String,
}

/// Campaign as served to pages: derived status and countdown, no session key.
#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub(super) struct CampaignView {
    #[schema(example = "summer-drop")]
    pub id: String,
    pub owner: String,
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[schema(example = "1.00")]
    pub prize_amount: String,
    #[schema(value_type = String, example = "1.0")]
    pub prize_pool: Decimal,
    pub prize_type: String,
    pub reward_type: RewardType,
    pub instant_reward: Option<InstantReward>,
    pub prize_tiers: Vec<PrizeTier>,
    pub tasks: Vec<Task>,
    #[schema(example = "7 days")]
    pub timeline: String,
    pub clicks: i64,
    pub joined: i64,
    pub participants: i64,
    pub total_winners: u32,
    pub status: CampaignStatus,
    pub time_remaining: TimeRemaining,
    pub permission_context: Option<PermissionContext>,
    pub has_session_key: bool,
    pub created_at: DateTime<Utc>,
}

impl CampaignView {
    pub fn new(campaign: Campaign, now: DateTime<Utc>) -> Self {
        let total_winners = total_winners(
            campaign.reward_type,
            campaign.instant_reward.as_ref(),
            &campaign.prize_tiers,
        );

        Self {
            status: derive_status(now, campaign.start_date, campaign.end_date),
            time_remaining: time_remaining(now, campaign.start_date, campaign.end_date),
            total_winners,
            has_session_key: campaign.session_private_key.is_some(),
            id: campaign.id,
            owner: campaign.owner,
            title: campaign.title,
            description: campaign.description,
            start_date: campaign.start_date,
            end_date: campaign.end_date,
            prize_amount: campaign.prize_amount,
            prize_pool: campaign.prize_pool,
            prize_type: campaign.prize_type,
            reward_type: campaign.reward_type,
            instant_reward: campaign.instant_reward,
            prize_tiers: campaign.prize_tiers,
            tasks: campaign.tasks,
            timeline: campaign.timeline,
            clicks: campaign.clicks,
            joined: campaign.joined,
            participants: campaign.participants,
            permission_context: campaign.permission_context,
            created_at: campaign.created_at,
        }
    }
}

pub(super) fn total_winners(
    reward_type: RewardType,
    instant: Option<&InstantReward>,
    tiers: &[PrizeTier],
) -> u32 {
    match reward_type {
        RewardType::Instant => instant.map(|r| r.number_of_winners).unwrap_or(0),
        RewardType::Giveaway => tiers.iter().map(|t| t.winners).sum(),
    }
}

fn share(amount: &str, winners: u32) -> Result<Decimal, PayoutError> {
    parse_amount(amount)?
        .checked_mul(Decimal::from(winners))
        .ok_or_else(|| PayoutError::InvalidAmount(amount.to_string()))
}

/// Everything the campaign can pay out: `amountPerWinner * numberOfWinners`
/// for instant rewards, the sum of `amount * winners` over the tiers otherwise.
pub(super) fn prize_pool(
    reward_type: RewardType,
    instant: Option<&InstantReward>,
    tiers: &[PrizeTier],
) -> Result<Decimal, PayoutError> {
    match (reward_type, instant) {
        (RewardType::Instant, Some(reward)) => {
            share(&reward.amount_per_winner, reward.number_of_winners)
        }
        (RewardType::Instant, None) => Ok(Decimal::ZERO),
        (RewardType::Giveaway, _) => tiers.iter().try_fold(Decimal::ZERO, |pool, tier| {
            pool.checked_add(share(&tier.amount, tier.winners)?)
                .ok_or_else(|| PayoutError::InvalidAmount(tier.amount.clone()))
        }),
    }
}

/// Two decimal places, e.g. "1.00".
pub(super) fn format_prize_amount(pool: Decimal) -> String {
    let mut rounded = pool.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateCampaignPayload {
    #[schema(example = "0x52908400098527886e0f7030069857d2e4169ee7")]
    pub owner: String,
    #[schema(example = "Summer Drop")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub reward_type: RewardType,
    pub instant_reward: Option<InstantReward>,
    #[serde(default)]
    pub prize_tiers: Vec<CreateCampaignPayloadPrizeTier>,
    pub tasks: Vec<CreateCampaignPayloadTask>,
    pub permission_context: Option<PermissionContext>,
    pub session_private_key: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub(super) struct CreateCampaignPayloadPrizeTier {
    #[schema(example = "1st place")]
    pub name: String,
    #[schema(example = "0.5")]
    pub amount: String,
    #[schema(example = 1)]
    pub winners: u32,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub(super) struct CreateCampaignPayloadTask {
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    #[schema(example = "https://twitter.com/touzi")]
    pub url: String,
}

fn bad_request(message: impl Into<String>) -> CampaignError {
    CampaignError::BadRequest(message.into())
}

fn check_amount(label: &str, amount: &str) -> Result<(), CampaignError> {
    parse_ether(amount)
        .map(|_| ())
        .map_err(|e| bad_request(format!("{}: {}", label, e)))
}

/// Validates the wizard payload and turns it into a new campaign record.
pub(super) fn build_campaign(
    payload: CreateCampaignPayload,
    now: DateTime<Utc>,
) -> Result<Campaign, CampaignError> {
    if !is_wallet_address(payload.owner.trim()) {
        return Err(bad_request(format!("Invalid owner wallet {}", payload.owner)));
    }
    if payload.end_date <= payload.start_date {
        return Err(bad_request("Campaign must end after it starts"));
    }
    if payload.tasks.is_empty() {
        return Err(bad_request("At least one task is required"));
    }
    if let Some(key) = &payload.session_private_key {
        if !is_session_key(key) {
            return Err(bad_request("Session key must be 0x followed by 64 hex digits"));
        }
    }

    let (instant_reward, prize_tiers) = match payload.reward_type {
        RewardType::Instant => {
            let reward = payload
                .instant_reward
                .ok_or_else(|| bad_request("Instant campaigns need an instantReward"))?;
            check_amount("amountPerWinner", &reward.amount_per_winner)?;
            if reward.number_of_winners == 0 {
                return Err(bad_request("numberOfWinners must be at least 1"));
            }
            (Some(reward), Vec::new())
        }
        RewardType::Giveaway => {
            if payload.prize_tiers.is_empty() {
                return Err(bad_request("Giveaways need at least one prize tier"));
            }
            let mut tiers = Vec::with_capacity(payload.prize_tiers.len());
            for (i, tier) in payload.prize_tiers.into_iter().enumerate() {
                check_amount(&format!("prize tier {}", i + 1), &tier.amount)?;
                if tier.winners == 0 {
                    return Err(bad_request(format!("prize tier {} has no winners", i + 1)));
                }
                let name = match tier.name.trim() {
                    "" => format!("Prize Tier {}", i + 1),
                    name => name.to_string(),
                };
                tiers.push(PrizeTier {
                    id: Uuid::new_v4().to_string(),
                    name,
                    amount: tier.amount.trim().to_string(),
                    winners: tier.winners,
                });
            }
            (None, tiers)
        }
    };

    let tasks = payload
        .tasks
        .into_iter()
        .map(|t| Task {
            id: Uuid::new_v4().to_string(),
            label: match t.label.trim() {
                "" => t.task_type.default_label().to_string(),
                label => label.to_string(),
            },
            task_type: t.task_type,
            url: t.url.trim().to_string(),
        })
        .collect();

    let title = match payload.title.trim() {
        "" => UNTITLED_ROOM.to_string(),
        title => title.to_string(),
    };

    let pool = prize_pool(payload.reward_type, instant_reward.as_ref(), &prize_tiers)
        .map_err(|e| bad_request(format!("prize pool: {}", e)))?;

    Ok(Campaign {
        id: slug::campaign_id(payload.title.trim()),
        owner: normalize_address(&payload.owner),
        title,
        description: payload.description.trim().to_string(),
        start_date: payload.start_date,
        end_date: payload.end_date,
        prize_amount: format_prize_amount(pool),
        prize_pool: pool,
        prize_type: PRIZE_TYPE.to_string(),
        reward_type: payload.reward_type,
        instant_reward,
        prize_tiers,
        tasks,
        timeline: timing::duration_text(payload.start_date, payload.end_date),
        clicks: 0,
        joined: 0,
        participants: 0,
        permission_context: payload.permission_context,
        session_private_key: payload.session_private_key,
        created_at: now,
    })
}

#[utoipa::path(
    post,
    path = "/campaign",
    request_body = CreateCampaignPayload,
    responses(
        (status = 201, description = "Campaign created successfully", body = CampaignView),
        (status = 400, description = "Payload failed validation", body = CampaignError),
        (status = 409, description = "A campaign with the same id already exists", body = CampaignError)
    )
)]
#[axum::debug_handler]
pub(super) async fn create_campaign(
    State(state): State<SharedState>,
    Json(payload): Json<CreateCampaignPayload>,
) -> Result<(StatusCode, Json<CampaignView>), CampaignError> {
    let now = Utc::now();
    let campaign = build_campaign(payload, now)?;

    state.store.insert_campaign(&campaign).await?;

    tracing::info!(
        id = %campaign.id,
        owner = %campaign.owner,
        reward_type = campaign.reward_type.as_str(),
        "campaign created"
    );

    Ok((StatusCode::CREATED, Json(CampaignView::new(campaign, now))))
}

#[utoipa::path(
    get,
    path = "/campaign/{id}",
    responses(
        (status = 200, description = "Get information about the campaign successfully", body = CampaignView),
        (status = 404, description = "Campaign ID doesn't exist", body = CampaignError)
    ),
    params(
        ("id" = String, Path, description = "Campaign slug")
    )
)]
pub(super) async fn get_campaign(
    Path(id): Path<String>,
    State(state): State<SharedState>,
) -> Result<Json<CampaignView>, CampaignError> {
    let campaign = state
        .store
        .get_campaign(&id)
        .await?
        .ok_or_else(|| not_found(&id))?;

    Ok(Json(CampaignView::new(campaign, Utc::now())))
}

#[utoipa::path(
    get,
    path = "/campaign",
    params(OwnerQuery),
    responses(
        (status = 200, description = "Campaigns of the owner, newest first", body = [CampaignView])
    )
)]
pub(super) async fn list_campaigns(
    Query(query): Query<OwnerQuery>,
    State(state): State<SharedState>,
) -> Result<Json<Vec<CampaignView>>, CampaignError> {
    let now = Utc::now();
    let owner = normalize_address(&query.owner);

    let campaigns = state.store.list_campaigns_by_owner(&owner).await?;

    Ok(Json(
        campaigns
            .into_iter()
            .map(|c| CampaignView::new(c, now))
            .collect(),
    ))
}

#[utoipa::path(
    delete,
    path = "/campaign/{id}",
    params(
        ("id" = String, Path, description = "Campaign slug"),
        OwnerQuery
    ),
    responses(
        (status = 200, description = "Campaign and its participants deleted"),
        (status = 403, description = "Caller is not the owner", body = CampaignError),
        (status = 404, description = "Campaign not found", body = CampaignError)
    )
)]
pub(super) async fn delete_campaign(
    Path(id): Path<String>,
    Query(query): Query<OwnerQuery>,
    State(state): State<SharedState>,
) -> Result<StatusCode, CampaignError> {
    let campaign = state
        .store
        .get_campaign(&id)
        .await?
        .ok_or_else(|| not_found(&id))?;

    if campaign.owner != normalize_address(&query.owner) {
        return Err(CampaignError::Forbidden(
            "Only the campaign owner can delete it".to_string(),
        ));
    }

    if !state.store.delete_campaign(&id).await? {
        return Err(not_found(&id));
    }
    if let Some(cache) = &state.cache {
        cache.forget_campaign(&id).await;
    }

    tracing::info!(%id, "campaign deleted");

    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/campaign/{id}/click",
    params(
        ("id" = String, Path, description = "Campaign slug")
    ),
    responses(
        (status = 204, description = "Click recorded"),
        (status = 404, description = "Campaign not found", body = CampaignError)
    )
)]
pub(super) async fn record_click(
    Path(id): Path<String>,
    State(state): State<SharedState>,
) -> Result<StatusCode, CampaignError> {
    if state.store.increment_clicks(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(&id))
    }
}
