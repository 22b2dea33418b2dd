use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::campaign::derive_status;
use crate::error::StoreError;
use crate::payout::{is_wallet_address, normalize_address, short_address};
use crate::state::SharedState;
use crate::types::{Campaign, CampaignStatus, Participant, ParticipantStatus};

mod filter;

pub use filter::{filter_participants, StatusCounts, StatusFilter};

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub(super) enum ParticipantError {
    #[schema(example = "Invalid wallet address")]
    BadRequest(String),
    #[schema(example = "No submission found")]
    NotFound(String),
    #[schema(example = "Wallet has already joined this campaign")]
    Conflict(String),
    #[schema(example = "Internal server error")]
    Internal(String),
}

impl IntoResponse for ParticipantError {
    fn into_response(self) -> Response {
        let status = match &self {
            ParticipantError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ParticipantError::NotFound(_) => StatusCode::NOT_FOUND,
            ParticipantError::Conflict(_) => StatusCode::CONFLICT,
            ParticipantError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

impl From<StoreError> for ParticipantError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(_) => already_joined(),
            other => {
                tracing::error!(error = %other, "participant store failure");
                ParticipantError::Internal("Internal server error".to_string())
            }
        }
    }
}

fn already_joined() -> ParticipantError {
    ParticipantError::Conflict("Wallet has already joined this campaign".to_string())
}

async fn load_campaign(state: &SharedState, id: &str) -> Result<Campaign, ParticipantError> {
    state
        .store
        .get_campaign(id)
        .await?
        .ok_or_else(|| ParticipantError::NotFound(format!("Campaign {} doesn't exist", id)))
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(super) struct SubmitEntryPayload {
    #[schema(example = "0x52908400098527886e0f7030069857d2e4169ee7")]
    pub wallet_address: String,
    pub email: Option<String>,
    #[schema(example = "@touzi")]
    pub twitter: Option<String>,
    /// Ids of the campaign tasks the participant opened
    #[serde(default)]
    pub completed_task_ids: Vec<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Counts the distinct submitted ids that name one of the campaign's tasks.
pub(super) fn count_completed(campaign: &Campaign, completed_task_ids: &[String]) -> i32 {
    let submitted: HashSet<&str> = completed_task_ids.iter().map(String::as_str).collect();

    campaign
        .tasks
        .iter()
        .filter(|task| submitted.contains(task.id.as_str()))
        .count() as i32
}

/// Builds the entry row. Instant campaigns verify on entry and owe
/// `amountPerWinner`; giveaways wait for the draw.
pub(super) fn new_entry(
    campaign: &Campaign,
    wallet_address: String,
    payload: SubmitEntryPayload,
) -> Participant {
    let instant = campaign.instant();

    Participant {
        id: Uuid::new_v4(),
        campaign_id: campaign.id.clone(),
        wallet_address,
        email: non_blank(payload.email),
        twitter: non_blank(payload.twitter),
        tasks_completed: count_completed(campaign, &payload.completed_task_ids),
        total_tasks: campaign.tasks.len() as i32,
        submitted_at: Utc::now(),
        status: if instant.is_some() {
            ParticipantStatus::Verified
        } else {
            ParticipantStatus::Pending
        },
        reward_paid: false,
        reward_amount: instant.map(|r| r.amount_per_winner.clone()),
    }
}

#[utoipa::path(
    post,
    path = "/campaign/{id}/participants",
    request_body = SubmitEntryPayload,
    params(
        ("id" = String, Path, description = "Campaign slug")
    ),
    responses(
        (status = 201, description = "Entry recorded", body = Participant),
        (status = 400, description = "Invalid wallet address", body = ParticipantError),
        (status = 404, description = "Campaign doesn't exist", body = ParticipantError),
        (status = 409, description = "Campaign not running, or wallet already joined", body = ParticipantError)
    )
)]
pub(super) async fn submit_entry(
    Path(id): Path<String>,
    State(state): State<SharedState>,
    Json(payload): Json<SubmitEntryPayload>,
) -> Result<(StatusCode, Json<Participant>), ParticipantError> {
    let wallet_address = normalize_address(&payload.wallet_address);
    if !is_wallet_address(&wallet_address) {
        return Err(ParticipantError::BadRequest(format!(
            "Invalid wallet address {}",
            payload.wallet_address
        )));
    }

    let campaign = load_campaign(&state, &id).await?;

    match derive_status(Utc::now(), campaign.start_date, campaign.end_date) {
        CampaignStatus::Scheduled => {
            return Err(ParticipantError::Conflict(
                "Campaign has not started yet".to_string(),
            ))
        }
        CampaignStatus::Ended => {
            return Err(ParticipantError::Conflict("Campaign has ended".to_string()))
        }
        CampaignStatus::Active => {}
    }

    if let Some(cache) = &state.cache {
        if cache.contains(&id, &wallet_address).await {
            return Err(already_joined());
        }
    }

    let entry = new_entry(&campaign, wallet_address, payload);

    let inserted = state.store.insert_participant(&entry).await;

    if let Some(cache) = &state.cache {
        if matches!(inserted, Ok(()) | Err(StoreError::Duplicate(_))) {
            cache.remember(&id, &entry.wallet_address).await;
        }
    }
    inserted?;

    tracing::info!(
        campaign = %id,
        wallet = %short_address(&entry.wallet_address),
        tasks = entry.tasks_completed,
        total_tasks = entry.total_tasks,
        "entry submitted"
    );

    Ok((StatusCode::CREATED, Json(entry)))
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(super) struct ParticipantQuery {
    /// `all` (default), `pending`, `verified` or `rejected`
    pub status: Option<StatusFilter>,
    /// Case-insensitive match on wallet, email or twitter
    pub search: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(super) struct ParticipantListItem {
    #[schema(example = "0x5290...9ee7")]
    pub short_address: String,
    #[serde(flatten)]
    pub participant: Participant,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub(super) struct ListParticipantsResult {
    pub participants: Vec<ParticipantListItem>,
    pub counts: StatusCounts,
}

#[utoipa::path(
    get,
    path = "/campaign/{id}/participants",
    params(
        ("id" = String, Path, description = "Campaign slug"),
        ParticipantQuery
    ),
    responses(
        (status = 200, description = "Submissions, newest first", body = ListParticipantsResult),
        (status = 404, description = "Campaign doesn't exist", body = ParticipantError)
    )
)]
pub(super) async fn list_participants(
    Path(id): Path<String>,
    Query(query): Query<ParticipantQuery>,
    State(state): State<SharedState>,
) -> Result<Json<ListParticipantsResult>, ParticipantError> {
    load_campaign(&state, &id).await?;

    let all = state.store.list_participants(&id).await?;
    let counts = StatusCounts::tally(&all);

    let participants = filter_participants(
        all,
        query.status.unwrap_or_default(),
        query.search.as_deref().unwrap_or(""),
    )
    .into_iter()
    .map(|participant| ParticipantListItem {
        short_address: short_address(&participant.wallet_address),
        participant,
    })
    .collect();

    Ok(Json(ListParticipantsResult {
        participants,
        counts,
    }))
}

#[utoipa::path(
    get,
    path = "/campaign/{id}/participants/{wallet}",
    params(
        ("id" = String, Path, description = "Campaign slug"),
        ("wallet" = String, Path, description = "Participant wallet address")
    ),
    responses(
        (status = 200, description = "The wallet's submission", body = Participant),
        (status = 404, description = "No submission found", body = ParticipantError)
    )
)]
pub(super) async fn get_participant(
    Path((id, wallet)): Path<(String, String)>,
    State(state): State<SharedState>,
) -> Result<Json<Participant>, ParticipantError> {
    state
        .store
        .get_participant(&id, &normalize_address(&wallet))
        .await?
        .map(Json)
        .ok_or_else(|| ParticipantError::NotFound("No submission found".to_string()))
}
