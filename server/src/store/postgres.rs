use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::RewardClaim;
use crate::types::{
    Campaign, InstantReward, Participant, PermissionContext, PrizeTier, Task,
};

pub struct PgStore {
    db_pool: PgPool,
}

#[derive(FromRow)]
struct CampaignRow {
    id: String,
    owner: String,
    title: String,
    description: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    prize_amount: String,
    prize_pool: Decimal,
    prize_type: String,
    reward_type: String,
    instant_reward: Option<Json<InstantReward>>,
    prize_tiers: Json<Vec<PrizeTier>>,
    tasks: Json<Vec<Task>>,
    timeline: String,
    clicks: i64,
    joined: i64,
    participants: i64,
    permission_context: Option<Json<PermissionContext>>,
    session_private_key: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CampaignRow> for Campaign {
    type Error = StoreError;

    fn try_from(row: CampaignRow) -> Result<Self, Self::Error> {
        let reward_type = row
            .reward_type
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("campaign {}: {}", row.id, e)))?;

        Ok(Campaign {
            id: row.id,
            owner: row.owner,
            title: row.title,
            description: row.description,
            start_date: row.start_date,
            end_date: row.end_date,
            prize_amount: row.prize_amount,
            prize_pool: row.prize_pool,
            prize_type: row.prize_type,
            reward_type,
            instant_reward: row.instant_reward.map(|r| r.0),
            prize_tiers: row.prize_tiers.0,
            tasks: row.tasks.0,
            timeline: row.timeline,
            clicks: row.clicks,
            joined: row.joined,
            participants: row.participants,
            permission_context: row.permission_context.map(|c| c.0),
            session_private_key: row.session_private_key,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct ParticipantRow {
    id: Uuid,
    campaign_id: String,
    wallet_address: String,
    email: Option<String>,
    twitter: Option<String>,
    tasks_completed: i32,
    total_tasks: i32,
    submitted_at: DateTime<Utc>,
    status: String,
    reward_paid: bool,
    reward_amount: Option<String>,
}

impl TryFrom<ParticipantRow> for Participant {
    type Error = StoreError;

    fn try_from(row: ParticipantRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("participant {}: {}", row.id, e)))?;

        Ok(Participant {
            id: row.id,
            campaign_id: row.campaign_id,
            wallet_address: row.wallet_address,
            email: row.email,
            twitter: row.twitter,
            tasks_completed: row.tasks_completed,
            total_tasks: row.total_tasks,
            submitted_at: row.submitted_at,
            status,
            reward_paid: row.reward_paid,
            reward_amount: row.reward_amount,
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let db_pool = PgPool::connect(database_url).await?;

        sqlx::migrate!("./migrations").run(&db_pool).await?;

        Ok(Self { db_pool })
    }

    pub async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), StoreError> {
        let q = "--sql
            insert into campaigns (
                id, owner, title, description, start_date, end_date,
                prize_amount, prize_pool, prize_type, reward_type,
                instant_reward, prize_tiers, tasks, timeline,
                clicks, joined, participants,
                permission_context, session_private_key, created_at
            )
            values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20);
        ";

        let q_result = sqlx::query(q)
            .bind(&campaign.id)
            .bind(&campaign.owner)
            .bind(&campaign.title)
            .bind(&campaign.description)
            .bind(campaign.start_date)
            .bind(campaign.end_date)
            .bind(&campaign.prize_amount)
            .bind(campaign.prize_pool)
            .bind(&campaign.prize_type)
            .bind(campaign.reward_type.as_str())
            .bind(campaign.instant_reward.as_ref().map(Json))
            .bind(Json(&campaign.prize_tiers))
            .bind(Json(&campaign.tasks))
            .bind(&campaign.timeline)
            .bind(campaign.clicks)
            .bind(campaign.joined)
            .bind(campaign.participants)
            .bind(campaign.permission_context.as_ref().map(Json))
            .bind(&campaign.session_private_key)
            .bind(campaign.created_at)
            .execute(&self.db_pool)
            .await;

        match q_result {
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::Duplicate(format!("campaign id {}", campaign.id)))
            }
            Err(err) => Err(err.into()),
            Ok(_) => Ok(()),
        }
    }

    pub async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, StoreError> {
        let q = "--sql
            select *
            from campaigns
            where id = $1;
        ";

        sqlx::query_as::<_, CampaignRow>(q)
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .map(Campaign::try_from)
            .transpose()
    }

    pub async fn list_campaigns_by_owner(&self, owner: &str) -> Result<Vec<Campaign>, StoreError> {
        let q = "--sql
            select *
            from campaigns
            where owner = $1
            order by created_at desc;
        ";

        sqlx::query_as::<_, CampaignRow>(q)
            .bind(owner)
            .fetch_all(&self.db_pool)
            .await?
            .into_iter()
            .map(Campaign::try_from)
            .collect()
    }

    pub async fn delete_campaign(&self, id: &str) -> Result<bool, StoreError> {
        let q = "--sql
            delete from campaigns
            where id = $1;
        ";

        let q_result = sqlx::query(q).bind(id).execute(&self.db_pool).await?;

        Ok(q_result.rows_affected() > 0)
    }

    pub async fn increment_clicks(&self, id: &str) -> Result<bool, StoreError> {
        let q = "--sql
            update campaigns
            set clicks = clicks + 1
            where id = $1;
        ";

        let q_result = sqlx::query(q).bind(id).execute(&self.db_pool).await?;

        Ok(q_result.rows_affected() > 0)
    }

    pub async fn insert_participant(&self, participant: &Participant) -> Result<(), StoreError> {
        let mut tx = self.db_pool.begin().await?;

        let inserted = sqlx::query(
            "--sql
                insert into participants (
                    id, campaign_id, wallet_address, email, twitter,
                    tasks_completed, total_tasks, submitted_at, status,
                    reward_paid, reward_amount
                )
                values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11);
            ",
        )
        .bind(participant.id)
        .bind(&participant.campaign_id)
        .bind(&participant.wallet_address)
        .bind(&participant.email)
        .bind(&participant.twitter)
        .bind(participant.tasks_completed)
        .bind(participant.total_tasks)
        .bind(participant.submitted_at)
        .bind(participant.status.as_str())
        .bind(participant.reward_paid)
        .bind(&participant.reward_amount)
        .execute(&mut *tx)
        .await;

        if let Err(err) = inserted {
            tx.rollback().await?;

            if is_unique_violation(&err) {
                return Err(StoreError::Duplicate(format!(
                    "wallet {} in campaign {}",
                    participant.wallet_address, participant.campaign_id
                )));
            }
            return Err(err.into());
        }

        sqlx::query(
            "--sql
                update campaigns
                set joined = joined + 1,
                    participants = participants + 1
                where id = $1;
            ",
        )
        .bind(&participant.campaign_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    pub async fn get_participant(
        &self,
        campaign_id: &str,
        wallet_address: &str,
    ) -> Result<Option<Participant>, StoreError> {
        let q = "--sql
            select *
            from participants
            where campaign_id = $1 and wallet_address = $2;
        ";

        sqlx::query_as::<_, ParticipantRow>(q)
            .bind(campaign_id)
            .bind(wallet_address)
            .fetch_optional(&self.db_pool)
            .await?
            .map(Participant::try_from)
            .transpose()
    }

    pub async fn list_participants(&self, campaign_id: &str) -> Result<Vec<Participant>, StoreError> {
        let q = "--sql
            select *
            from participants
            where campaign_id = $1
            order by submitted_at desc;
        ";

        sqlx::query_as::<_, ParticipantRow>(q)
            .bind(campaign_id)
            .fetch_all(&self.db_pool)
            .await?
            .into_iter()
            .map(Participant::try_from)
            .collect()
    }

    pub async fn reserve_reward(
        &self,
        participant_id: Uuid,
        campaign_id: &str,
        amount: &str,
        winners: u32,
    ) -> Result<RewardClaim, StoreError> {
        let mut tx = self.db_pool.begin().await?;

        // Serializes claims per campaign so the paid count below stays valid
        // until the update commits.
        sqlx::query(
            "--sql
                select id
                from campaigns
                where id = $1
                for update;
            ",
        )
        .bind(campaign_id)
        .fetch_optional(&mut *tx)
        .await?;

        let reward_paid: Option<bool> = sqlx::query_scalar(
            "--sql
                select reward_paid
                from participants
                where id = $1 and campaign_id = $2;
            ",
        )
        .bind(participant_id)
        .bind(campaign_id)
        .fetch_optional(&mut *tx)
        .await?;

        match reward_paid {
            None => {
                tx.rollback().await?;
                return Err(StoreError::Corrupt(format!(
                    "participant {} is not in campaign {}",
                    participant_id, campaign_id
                )));
            }
            Some(true) => {
                tx.rollback().await?;
                return Ok(RewardClaim::AlreadyPaid);
            }
            Some(false) => {}
        }

        let paid: i64 = sqlx::query_scalar(
            "--sql
                select count(*)
                from participants
                where campaign_id = $1 and reward_paid;
            ",
        )
        .bind(campaign_id)
        .fetch_one(&mut *tx)
        .await?;

        if paid >= i64::from(winners) {
            tx.rollback().await?;
            return Ok(RewardClaim::Exhausted);
        }

        let row = sqlx::query_as::<_, ParticipantRow>(
            "--sql
                update participants
                set reward_paid = true,
                    reward_amount = $2
                where id = $1 and reward_paid = false
                returning *;
            ",
        )
        .bind(participant_id)
        .bind(amount)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(RewardClaim::AlreadyPaid);
        };

        tx.commit().await?;

        Ok(RewardClaim::Reserved(row.try_into()?))
    }

    pub async fn release_reward(&self, participant_id: Uuid) -> Result<bool, StoreError> {
        let q = "--sql
            update participants
            set reward_paid = false
            where id = $1 and reward_paid = true;
        ";

        let q_result = sqlx::query(q)
            .bind(participant_id)
            .execute(&self.db_pool)
            .await?;

        Ok(q_result.rows_affected() > 0)
    }
}
