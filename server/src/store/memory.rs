use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::RewardClaim;
use crate::types::{Campaign, Participant};

#[derive(Default, Clone, Serialize, Deserialize)]
struct Snapshot {
    campaigns: BTreeMap<String, Campaign>,
    participants: Vec<Participant>,
}

/// Offline mirror of the hosted tables.
///
/// Writes are staged on a copy of the data. When a snapshot file is
/// configured the copy is written to a temporary file and renamed over the
/// snapshot, and only then becomes visible. A failed write leaves both the
/// file and the in-memory state untouched.
pub struct MemoryStore {
    data: Mutex<Snapshot>,
    path: Option<PathBuf>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(Snapshot::default()),
            path: None,
        }
    }

    pub async fn open(path: PathBuf) -> Result<Self, StoreError> {
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(err) => return Err(err.into()),
        };

        tracing::info!(
            path = %path.display(),
            campaigns = snapshot.campaigns.len(),
            participants = snapshot.participants.len(),
            "loaded local store snapshot"
        );

        Ok(Self {
            data: Mutex::new(snapshot),
            path: Some(path),
        })
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        if let Some(path) = &self.path {
            let bytes = serde_json::to_vec_pretty(snapshot)?;
            let staged = path.with_extension("json.tmp");
            tokio::fs::write(&staged, bytes).await?;
            tokio::fs::rename(&staged, path).await?;
        }
        Ok(())
    }

    async fn commit(
        &self,
        data: &mut MutexGuard<'_, Snapshot>,
        next: Snapshot,
    ) -> Result<(), StoreError> {
        self.persist(&next).await?;
        **data = next;
        Ok(())
    }

    pub async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;

        if data.campaigns.contains_key(&campaign.id) {
            return Err(StoreError::Duplicate(format!("campaign id {}", campaign.id)));
        }
        let mut next = data.clone();
        next.campaigns.insert(campaign.id.clone(), campaign.clone());

        self.commit(&mut data, next).await
    }

    pub async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, StoreError> {
        Ok(self.data.lock().await.campaigns.get(id).cloned())
    }

    pub async fn list_campaigns_by_owner(&self, owner: &str) -> Result<Vec<Campaign>, StoreError> {
        let data = self.data.lock().await;

        let mut campaigns: Vec<Campaign> = data
            .campaigns
            .values()
            .filter(|c| c.owner == owner)
            .cloned()
            .collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(campaigns)
    }

    pub async fn delete_campaign(&self, id: &str) -> Result<bool, StoreError> {
        let mut data = self.data.lock().await;

        if !data.campaigns.contains_key(id) {
            return Ok(false);
        }
        let mut next = data.clone();
        next.campaigns.remove(id);
        next.participants.retain(|p| p.campaign_id != id);

        self.commit(&mut data, next).await?;
        Ok(true)
    }

    pub async fn increment_clicks(&self, id: &str) -> Result<bool, StoreError> {
        let mut data = self.data.lock().await;

        let mut next = data.clone();
        match next.campaigns.get_mut(id) {
            Some(campaign) => campaign.clicks += 1,
            None => return Ok(false),
        }

        self.commit(&mut data, next).await?;
        Ok(true)
    }

    pub async fn insert_participant(&self, participant: &Participant) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;

        let duplicate = data.participants.iter().any(|p| {
            p.campaign_id == participant.campaign_id
                && p.wallet_address == participant.wallet_address
        });
        if duplicate {
            return Err(StoreError::Duplicate(format!(
                "wallet {} in campaign {}",
                participant.wallet_address, participant.campaign_id
            )));
        }

        let mut next = data.clone();
        let campaign = next
            .campaigns
            .get_mut(&participant.campaign_id)
            .ok_or_else(|| {
                StoreError::Corrupt(format!("campaign {} does not exist", participant.campaign_id))
            })?;
        campaign.joined += 1;
        campaign.participants += 1;
        next.participants.push(participant.clone());

        self.commit(&mut data, next).await
    }

    pub async fn get_participant(
        &self,
        campaign_id: &str,
        wallet_address: &str,
    ) -> Result<Option<Participant>, StoreError> {
        let data = self.data.lock().await;

        Ok(data
            .participants
            .iter()
            .find(|p| p.campaign_id == campaign_id && p.wallet_address == wallet_address)
            .cloned())
    }

    pub async fn list_participants(&self, campaign_id: &str) -> Result<Vec<Participant>, StoreError> {
        let data = self.data.lock().await;

        let mut participants: Vec<Participant> = data
            .participants
            .iter()
            .filter(|p| p.campaign_id == campaign_id)
            .cloned()
            .collect();
        participants.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));

        Ok(participants)
    }

    pub async fn reserve_reward(
        &self,
        participant_id: Uuid,
        campaign_id: &str,
        amount: &str,
        winners: u32,
    ) -> Result<RewardClaim, StoreError> {
        let mut data = self.data.lock().await;

        let index = data
            .participants
            .iter()
            .position(|p| p.id == participant_id && p.campaign_id == campaign_id)
            .ok_or_else(|| {
                StoreError::Corrupt(format!(
                    "participant {} is not in campaign {}",
                    participant_id, campaign_id
                ))
            })?;

        if data.participants[index].reward_paid {
            return Ok(RewardClaim::AlreadyPaid);
        }

        let paid = data
            .participants
            .iter()
            .filter(|p| p.campaign_id == campaign_id && p.reward_paid)
            .count();
        if paid >= winners as usize {
            return Ok(RewardClaim::Exhausted);
        }

        let mut next = data.clone();
        let participant = &mut next.participants[index];
        participant.reward_paid = true;
        participant.reward_amount = Some(amount.to_string());
        let reserved = participant.clone();

        self.commit(&mut data, next).await?;
        Ok(RewardClaim::Reserved(reserved))
    }

    pub async fn release_reward(&self, participant_id: Uuid) -> Result<bool, StoreError> {
        let mut data = self.data.lock().await;

        let mut next = data.clone();
        match next
            .participants
            .iter_mut()
            .find(|p| p.id == participant_id && p.reward_paid)
        {
            Some(participant) => participant.reward_paid = false,
            None => return Ok(false),
        }

        self.commit(&mut data, next).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use super::*;
    use crate::types::{ParticipantStatus, RewardType};

    fn campaign(id: &str, owner: &str, age_minutes: i64) -> Campaign {
        let now = Utc::now();
        Campaign {
            id: id.to_string(),
            owner: owner.to_string(),
            title: id.to_string(),
            description: String::new(),
            start_date: now - Duration::hours(1),
            end_date: now + Duration::hours(1),
            prize_amount: "1.00".to_string(),
            prize_pool: Decimal::ONE,
            prize_type: "ETH".to_string(),
            reward_type: RewardType::Giveaway,
            instant_reward: None,
            prize_tiers: vec![],
            tasks: vec![],
            timeline: "2 hours".to_string(),
            clicks: 0,
            joined: 0,
            participants: 0,
            permission_context: None,
            session_private_key: None,
            created_at: now - Duration::minutes(age_minutes),
        }
    }

    fn participant(campaign_id: &str, wallet: &str) -> Participant {
        Participant {
            id: Uuid::new_v4(),
            campaign_id: campaign_id.to_string(),
            wallet_address: wallet.to_string(),
            email: None,
            twitter: None,
            tasks_completed: 0,
            total_tasks: 0,
            submitted_at: Utc::now(),
            status: ParticipantStatus::Pending,
            reward_paid: false,
            reward_amount: None,
        }
    }

    #[tokio::test]
    async fn duplicate_wallet_is_rejected_and_counted_once() {
        let store = MemoryStore::new();
        store.insert_campaign(&campaign("room", "0xa", 0)).await.unwrap();

        store.insert_participant(&participant("room", "0xw")).await.unwrap();
        let second = store.insert_participant(&participant("room", "0xw")).await;

        assert!(matches!(second, Err(StoreError::Duplicate(_))));
        assert_eq!(store.list_participants("room").await.unwrap().len(), 1);
        let stored = store.get_campaign("room").await.unwrap().unwrap();
        assert_eq!(stored.joined, 1);
        assert_eq!(stored.participants, 1);
    }

    #[tokio::test]
    async fn owner_listing_is_newest_first() {
        let store = MemoryStore::new();
        store.insert_campaign(&campaign("old", "0xa", 60)).await.unwrap();
        store.insert_campaign(&campaign("new", "0xa", 1)).await.unwrap();
        store.insert_campaign(&campaign("other", "0xb", 0)).await.unwrap();

        let ids: Vec<String> = store
            .list_campaigns_by_owner("0xa")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    fn paid(store: &MemoryStore) -> usize {
        store
            .data
            .try_lock()
            .unwrap()
            .participants
            .iter()
            .filter(|p| p.reward_paid)
            .count()
    }

    #[tokio::test]
    async fn reward_is_reserved_only_once() {
        let store = MemoryStore::new();
        store.insert_campaign(&campaign("room", "0xa", 0)).await.unwrap();
        let entry = participant("room", "0xw");
        store.insert_participant(&entry).await.unwrap();

        let first = store.reserve_reward(entry.id, "room", "0.1", 5).await.unwrap();
        let second = store.reserve_reward(entry.id, "room", "0.1", 5).await.unwrap();

        match first {
            RewardClaim::Reserved(p) => assert_eq!(p.reward_amount.as_deref(), Some("0.1")),
            other => panic!("expected a reservation, got {:?}", other),
        }
        assert_eq!(second, RewardClaim::AlreadyPaid);
        assert_eq!(paid(&store), 1);
    }

    #[tokio::test]
    async fn reservations_stop_at_the_winner_count() {
        let store = MemoryStore::new();
        store.insert_campaign(&campaign("room", "0xa", 0)).await.unwrap();
        let first = participant("room", "0xw1");
        let second = participant("room", "0xw2");
        store.insert_participant(&first).await.unwrap();
        store.insert_participant(&second).await.unwrap();

        let claimed = store.reserve_reward(first.id, "room", "0.1", 1).await.unwrap();
        assert!(matches!(claimed, RewardClaim::Reserved(_)));

        let refused = store.reserve_reward(second.id, "room", "0.1", 1).await.unwrap();
        assert_eq!(refused, RewardClaim::Exhausted);

        assert!(store.release_reward(first.id).await.unwrap());
        assert!(!store.release_reward(first.id).await.unwrap());

        let retried = store.reserve_reward(second.id, "room", "0.1", 1).await.unwrap();
        assert!(matches!(retried, RewardClaim::Reserved(_)));
        assert_eq!(paid(&store), 1);
    }

    #[tokio::test]
    async fn deleting_a_campaign_drops_its_participants() {
        let store = MemoryStore::new();
        store.insert_campaign(&campaign("room", "0xa", 0)).await.unwrap();
        store.insert_participant(&participant("room", "0xw")).await.unwrap();

        assert!(store.delete_campaign("room").await.unwrap());
        assert!(!store.delete_campaign("room").await.unwrap());
        assert!(store.get_participant("room", "0xw").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let path = std::env::temp_dir().join(format!("touzi-store-{}.json", Uuid::new_v4()));

        let store = MemoryStore::open(path.clone()).await.unwrap();
        store.insert_campaign(&campaign("room", "0xa", 0)).await.unwrap();
        store.increment_clicks("room").await.unwrap();
        drop(store);

        let reopened = MemoryStore::open(path.clone()).await.unwrap();
        let stored = reopened.get_campaign("room").await.unwrap().unwrap();
        assert_eq!(stored.clicks, 1);

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn failed_snapshot_write_changes_nothing() {
        let path = std::env::temp_dir()
            .join(format!("touzi-missing-{}", Uuid::new_v4()))
            .join("store.json");

        let store = MemoryStore::open(path).await.unwrap();

        let inserted = store.insert_campaign(&campaign("room", "0xa", 0)).await;

        assert!(matches!(inserted, Err(StoreError::Io(_))));
        assert!(store.get_campaign("room").await.unwrap().is_none());
    }
}
