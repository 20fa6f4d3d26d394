use std::fmt::{Display, Formatter};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::typedid::{TypedId, TypedIdMarker};

pub mod db;
pub mod endpoints;
pub mod manager;
pub use endpoints::*;

pub type CampaignId = TypedId<Campaign>;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Campaign {
    #[serde(rename = "_id")]
    pub id: CampaignId,
    pub name: String,
    pub objective: String,
    pub campaign_type: String,
    pub daily_budget: i64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: CampaignStatus,
    pub remote_campaign_id: Option<String>,
    pub ad_group_name: String,
    pub ad_headline: String,
    pub ad_description: String,
    pub asset_url: Option<String>,
    pub pending_publish: Option<PendingPublish>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub modified_at: DateTime<Utc>,
}

impl TypedIdMarker for Campaign {
    fn tag() -> &'static str {
        "CMP"
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    Draft,
    Published,
    Paused,
}

impl CampaignStatus {
    pub fn can_publish(self) -> bool {
        self == CampaignStatus::Draft
    }
}

impl Display for CampaignStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignStatus::Draft => f.write_str("DRAFT"),
            CampaignStatus::Published => f.write_str("PUBLISHED"),
            CampaignStatus::Paused => f.write_str("PAUSED"),
        }
    }
}

/// Written before the remote publish is attempted and cleared by the write
/// that records its outcome. A campaign carrying one that never got cleared
/// may already exist on the platform.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PendingPublish {
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub started_at: DateTime<Utc>,
}
