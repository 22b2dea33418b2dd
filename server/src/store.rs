use uuid::Uuid;

use crate::error::StoreError;
use crate::types::{Campaign, Participant};

pub use memory::MemoryStore;
pub use postgres::PgStore;

mod memory;
mod postgres;

#[derive(Debug, Clone, PartialEq)]
pub enum RewardClaim {
    /// The reward is now marked paid for this participant.
    Reserved(Participant),
    AlreadyPaid,
    /// Every winner slot is taken.
    Exhausted,
}

/// Campaign and participant persistence, either the hosted Postgres tables or
/// the offline in-memory mirror.
pub enum Store {
    Postgres(PgStore),
    Memory(MemoryStore),
}

impl Store {
    pub async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), StoreError> {
        match self {
            Store::Postgres(s) => s.insert_campaign(campaign).await,
            Store::Memory(s) => s.insert_campaign(campaign).await,
        }
    }

    pub async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, StoreError> {
        match self {
            Store::Postgres(s) => s.get_campaign(id).await,
            Store::Memory(s) => s.get_campaign(id).await,
        }
    }

    /// Newest first.
    pub async fn list_campaigns_by_owner(&self, owner: &str) -> Result<Vec<Campaign>, StoreError> {
        match self {
            Store::Postgres(s) => s.list_campaigns_by_owner(owner).await,
            Store::Memory(s) => s.list_campaigns_by_owner(owner).await,
        }
    }

    /// Removes the campaign and its participants. Returns false if it did not exist.
    pub async fn delete_campaign(&self, id: &str) -> Result<bool, StoreError> {
        match self {
            Store::Postgres(s) => s.delete_campaign(id).await,
            Store::Memory(s) => s.delete_campaign(id).await,
        }
    }

    pub async fn increment_clicks(&self, id: &str) -> Result<bool, StoreError> {
        match self {
            Store::Postgres(s) => s.increment_clicks(id).await,
            Store::Memory(s) => s.increment_clicks(id).await,
        }
    }

    /// Inserts the entry and bumps the campaign's `joined`/`participants`
    /// counters together. A second entry for the same wallet fails with
    /// [`StoreError::Duplicate`].
    pub async fn insert_participant(&self, participant: &Participant) -> Result<(), StoreError> {
        match self {
            Store::Postgres(s) => s.insert_participant(participant).await,
            Store::Memory(s) => s.insert_participant(participant).await,
        }
    }

    pub async fn get_participant(
        &self,
        campaign_id: &str,
        wallet_address: &str,
    ) -> Result<Option<Participant>, StoreError> {
        match self {
            Store::Postgres(s) => s.get_participant(campaign_id, wallet_address).await,
            Store::Memory(s) => s.get_participant(campaign_id, wallet_address).await,
        }
    }

    /// Newest submission first.
    pub async fn list_participants(&self, campaign_id: &str) -> Result<Vec<Participant>, StoreError> {
        match self {
            Store::Postgres(s) => s.list_participants(campaign_id).await,
            Store::Memory(s) => s.list_participants(campaign_id).await,
        }
    }

    /// Marks the participant's reward as paid before any payout is sent, so
    /// a wallet is paid at most once and never past `winners` paid rewards.
    /// The paid check, the winner count and the update happen as one step.
    pub async fn reserve_reward(
        &self,
        participant_id: Uuid,
        campaign_id: &str,
        amount: &str,
        winners: u32,
    ) -> Result<RewardClaim, StoreError> {
        match self {
            Store::Postgres(s) => {
                s.reserve_reward(participant_id, campaign_id, amount, winners)
                    .await
            }
            Store::Memory(s) => {
                s.reserve_reward(participant_id, campaign_id, amount, winners)
                    .await
            }
        }
    }

    /// Hands a reserved reward back after a failed payout. Returns false if
    /// the reward was not marked paid.
    pub async fn release_reward(&self, participant_id: Uuid) -> Result<bool, StoreError> {
        match self {
            Store::Postgres(s) => s.release_reward(participant_id).await,
            Store::Memory(s) => s.release_reward(participant_id).await,
        }
    }
}
