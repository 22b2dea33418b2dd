use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::{Participant, ParticipantStatus};

#[derive(Serialize, Deserialize, ToSchema, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Verified,
    Rejected,
}

impl StatusFilter {
    fn matches(self, status: ParticipantStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Pending => status == ParticipantStatus::Pending,
            StatusFilter::Verified => status == ParticipantStatus::Verified,
            StatusFilter::Rejected => status == ParticipantStatus::Rejected,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub all: usize,
    pub pending: usize,
    pub verified: usize,
    pub rejected: usize,
}

impl StatusCounts {
    pub fn tally(participants: &[Participant]) -> Self {
        participants
            .iter()
            .fold(StatusCounts::default(), |mut counts, p| {
                counts.all += 1;
                match p.status {
                    ParticipantStatus::Pending => counts.pending += 1,
                    ParticipantStatus::Verified => counts.verified += 1,
                    ParticipantStatus::Rejected => counts.rejected += 1,
                }
                counts
            })
    }
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack
        .map(|h| h.to_lowercase().contains(needle))
        .unwrap_or(false)
}

/// Keeps the order of `participants`. An empty search matches everything.
pub fn filter_participants(
    participants: Vec<Participant>,
    status: StatusFilter,
    search: &str,
) -> Vec<Participant> {
    let needle = search.trim().to_lowercase();

    participants
        .into_iter()
        .filter(|p| status.matches(p.status))
        .filter(|p| {
            needle.is_empty()
                || contains_ci(Some(&p.wallet_address), &needle)
                || contains_ci(p.email.as_deref(), &needle)
                || contains_ci(p.twitter.as_deref(), &needle)
        })
        .collect()
}
