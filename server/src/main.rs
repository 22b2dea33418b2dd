use std::sync::Arc;

use axum::{routing, Router, Server};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;
use utoipa_redoc::{Redoc, Servable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::error::ServerError;
use crate::state::{AppState, SharedState};
use crate::types::{
    CampaignStatus, InstantReward, Participant, ParticipantStatus, PermissionContext, PrizeTier,
    RewardType, Task, TaskType,
};

use campaign::{
    CampaignError, CampaignView, CreateCampaignPayload, CreateCampaignPayloadPrizeTier,
    CreateCampaignPayloadTask, TimeRemaining,
};
use dashboard::{DashboardError, DashboardResult, DashboardStats};
use participant::{
    ListParticipantsResult, ParticipantError, ParticipantListItem, StatusCounts, StatusFilter,
    SubmitEntryPayload,
};
use reward::{ClaimError, ClaimRewardPayload, ClaimRewardResult};

mod campaign;
mod dashboard;
mod participant;
mod reward;

mod cache;
mod config;
mod error;
mod payout;
mod state;
mod store;
mod types;

#[cfg(test)]
mod testing;

#[derive(OpenApi)]
#[openapi(
    paths(
        campaign::create_campaign,
        campaign::get_campaign,
        campaign::list_campaigns,
        campaign::delete_campaign,
        campaign::record_click,
        participant::submit_entry,
        participant::list_participants,
        participant::get_participant,
        reward::claim_reward,
        dashboard::get_dashboard,
    ),
    components(
        schemas(RewardType, InstantReward, PrizeTier, TaskType, Task, PermissionContext),
        schemas(CampaignStatus, ParticipantStatus, Participant),
        schemas(CampaignError, CampaignView, TimeRemaining, CreateCampaignPayload, CreateCampaignPayloadPrizeTier, CreateCampaignPayloadTask),
        schemas(ParticipantError, SubmitEntryPayload, ListParticipantsResult, ParticipantListItem, StatusCounts, StatusFilter),
        schemas(ClaimError, ClaimRewardPayload, ClaimRewardResult),
        schemas(DashboardError, DashboardResult, DashboardStats),
    ),
    tags(
        (name = "campaign", description = "Giveaway room management API"),
        (name = "participant", description = "Entry submission API"),
        (name = "reward", description = "Instant reward payout API"),
        (name = "dashboard", description = "Owner dashboard API")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("touzi_server=info")),
        )
        .init();

    let config = Config::from_env()?;
    let state = Arc::new(AppState::from_config(&config).await?);

    let app = create_app(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Redoc::with_url("/redoc", ApiDoc::openapi()))
        .merge(RapiDoc::new("/api-docs/openapi.json").path("/rapidoc"));

    let address = config.bind_address;
    tracing::info!(
        %address,
        "API playgrounds available on /swagger-ui, /redoc and /rapidoc"
    );

    Server::bind(&address)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

pub fn create_app(state: SharedState) -> Router {
    Router::new()
        .route(
            "/campaign",
            routing::get(campaign::list_campaigns).post(campaign::create_campaign),
        )
        .route(
            "/campaign/:id",
            routing::get(campaign::get_campaign).delete(campaign::delete_campaign),
        )
        .route("/campaign/:id/click", routing::post(campaign::record_click))
        .route(
            "/campaign/:id/participants",
            routing::get(participant::list_participants).post(participant::submit_entry),
        )
        .route(
            "/campaign/:id/participants/:wallet",
            routing::get(participant::get_participant),
        )
        .route("/api/claim-reward", routing::post(reward::claim_reward))
        .route("/dashboard", routing::get(dashboard::get_dashboard))
        .with_state(state)
}
