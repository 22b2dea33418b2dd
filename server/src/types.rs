use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, Deserialize, ToSchema, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RewardType {
    Instant,
    Giveaway,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstantReward {
    #[schema(example = "0.1")]
    pub amount_per_winner: String,
    #[schema(example = 10)]
    pub number_of_winners: u32,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrizeTier {
    pub id: String,
    #[schema(example = "1st place")]
    pub name: String,
    #[schema(example = "0.5")]
    pub amount: String,
    #[schema(example = 1)]
    pub winners: u32,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    XFollow,
    XRetweet,
    XLike,
    XComment,
    IgFollow,
    IgLike,
    FbFollow,
    FbLike,
    YtSubscribe,
    YtLike,
    TgJoin,
    DiscordJoin,
    WebsiteVisit,
    Referral,
}

impl TaskType {
    pub fn default_label(self) -> &'static str {
        match self {
            TaskType::XFollow => "Follow on X",
            TaskType::XRetweet => "Retweet Post",
            TaskType::XLike => "Like Tweet",
            TaskType::XComment => "Comment on Tweet",
            TaskType::IgFollow => "Follow on Instagram",
            TaskType::IgLike => "Like Instagram Post",
            TaskType::FbFollow => "Follow on Facebook",
            TaskType::FbLike => "Like Facebook Post",
            TaskType::YtSubscribe => "Subscribe on YouTube",
            TaskType::YtLike => "Like YouTube Video",
            TaskType::TgJoin => "Join Telegram Group",
            TaskType::DiscordJoin => "Join Discord Server",
            TaskType::WebsiteVisit => "Visit Website",
            TaskType::Referral => "Refer Friends",
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq)]
pub struct Task {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[schema(example = "Follow on X")]
    pub label: String,
    #[schema(example = "https://twitter.com/touzi")]
    pub url: String,
}

/// Grant recorded when the owner delegated payout rights to a session key.
#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PermissionContext {
    pub granted_at: i64,
    pub expiry: i64,
    pub signer: String,
    pub permissions: Vec<String>,
    pub limit: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub prize_amount: String,
    pub prize_pool: Decimal,
    pub prize_type: String,
    pub reward_type: RewardType,
    pub instant_reward: Option<InstantReward>,
    pub prize_tiers: Vec<PrizeTier>,
    pub tasks: Vec<Task>,
    pub timeline: String,
    pub clicks: i64,
    pub joined: i64,
    pub participants: i64,
    pub permission_context: Option<PermissionContext>,
    pub session_private_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    /// The instant payout config, only when this is an instant campaign that has one.
    pub fn instant(&self) -> Option<&InstantReward> {
        match self.reward_type {
            RewardType::Instant => self.instant_reward.as_ref(),
            RewardType::Giveaway => None,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Scheduled,
    Active,
    Ended,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    Pending,
    Verified,
    Rejected,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: Uuid,
    pub campaign_id: String,
    #[schema(example = "0x52908400098527886e0f7030069857d2e4169ee7")]
    pub wallet_address: String,
    pub email: Option<String>,
    pub twitter: Option<String>,
    pub tasks_completed: i32,
    pub total_tasks: i32,
    pub submitted_at: DateTime<Utc>,
    pub status: ParticipantStatus,
    pub reward_paid: bool,
    #[schema(example = "0.1")]
    pub reward_amount: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant `{}`", self.0)
    }
}

impl RewardType {
    pub fn as_str(self) -> &'static str {
        match self {
            RewardType::Instant => "instant",
            RewardType::Giveaway => "giveaway",
        }
    }
}

impl FromStr for RewardType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instant" => Ok(RewardType::Instant),
            "giveaway" => Ok(RewardType::Giveaway),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl ParticipantStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ParticipantStatus::Pending => "pending",
            ParticipantStatus::Verified => "verified",
            ParticipantStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ParticipantStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ParticipantStatus::Pending),
            "verified" => Ok(ParticipantStatus::Verified),
            "rejected" => Ok(ParticipantStatus::Rejected),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_type_uses_kebab_case_ids() {
        let task: Task = serde_json::from_str(
            r#"{"id":"1","type":"discord-join","label":"","url":"https://discord.gg/x"}"#,
        )
        .unwrap();
        assert_eq!(task.task_type, TaskType::DiscordJoin);
        assert_eq!(task.task_type.default_label(), "Join Discord Server");
    }

    #[test]
    fn enum_strings_round_trip_through_from_str() {
        assert_eq!("instant".parse::<RewardType>(), Ok(RewardType::Instant));
        assert_eq!(
            "verified".parse::<ParticipantStatus>(),
            Ok(ParticipantStatus::Verified)
        );
        assert!("paid".parse::<ParticipantStatus>().is_err());
    }
}
