use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::options::FindOptions;
use mongodb::{bson, Database};

use crate::database::MongoCampaignStore;
use crate::error::Error;

use super::{Campaign, CampaignId, CampaignStatus, PendingPublish};

const CAMPAIGNS: &str = "campaigns";

pub async fn initialize(db: &Database) -> Result<(), Error> {
    db.run_command(
        bson::doc! {
            "createIndexes": CAMPAIGNS,
            "indexes": [
                { "key": { "created_at": -1 }, "name": "by_created_at" },
            ]
        },
        None,
    )
    .await?;

    Ok(())
}

/// Every update is conditional on the campaign's `modified_at`, so a write
/// based on a stale read fails with `ConcurrentModificationDetected` instead
/// of overwriting someone else's transition.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), Error>;

    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, Error>;

    async fn fetch_campaign_by_id(&self, campaign_id: CampaignId)
        -> Result<Option<Campaign>, Error>;

    async fn update_campaign_pending_publish(
        &self,
        campaign: Campaign,
        pending_publish: Option<PendingPublish>,
    ) -> Result<Campaign, Error>;

    async fn update_campaign_published(
        &self,
        campaign: Campaign,
        remote_campaign_id: String,
    ) -> Result<Campaign, Error>;

    async fn update_campaign_status(
        &self,
        campaign: Campaign,
        status: CampaignStatus,
    ) -> Result<Campaign, Error>;
}

#[async_trait]
impl CampaignStore for MongoCampaignStore {
    #[tracing::instrument(skip(self))]
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), Error> {
        self.insert_one(campaign, None).await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, Error> {
        let options = FindOptions::builder()
            .sort(bson::doc! { "created_at": -1 })
            .build();

        let campaigns: Vec<Campaign> = self
            .find(bson::doc! {}, options)
            .await?
            .try_collect()
            .await?;

        Ok(campaigns)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_campaign_by_id(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Option<Campaign>, Error> {
        let campaign: Option<Campaign> = self
            .find_one(bson::doc! { "_id": campaign_id }, None)
            .await?;

        Ok(campaign)
    }

    #[tracing::instrument(skip(self))]
    async fn update_campaign_pending_publish(
        &self,
        mut campaign: Campaign,
        pending_publish: Option<PendingPublish>,
    ) -> Result<Campaign, Error> {
        let now = Utc::now();
        let old_modified_at = bson::DateTime::from_chrono(campaign.modified_at);
        let new_modified_at = bson::DateTime::from_chrono(now);
        let new_pending_publish = bson::to_bson(&pending_publish)?;

        let result = self
            .update_one(
                bson::doc! { "_id": campaign.id, "modified_at": old_modified_at },
                bson::doc! { "$set": {
                    "pending_publish": new_pending_publish,
                    "modified_at": new_modified_at
                } },
                None,
            )
            .await?;

        if result.matched_count == 0 {
            return Err(Error::ConcurrentModificationDetected);
        }

        campaign.modified_at = now;
        campaign.pending_publish = pending_publish;

        Ok(campaign)
    }

    #[tracing::instrument(skip(self))]
    async fn update_campaign_published(
        &self,
        mut campaign: Campaign,
        remote_campaign_id: String,
    ) -> Result<Campaign, Error> {
        let now = Utc::now();
        let old_modified_at = bson::DateTime::from_chrono(campaign.modified_at);
        let new_modified_at = bson::DateTime::from_chrono(now);
        let new_status = bson::to_bson(&CampaignStatus::Published)?;

        let result = self
            .update_one(
                bson::doc! { "_id": campaign.id, "modified_at": old_modified_at },
                bson::doc! { "$set": {
                    "status": new_status,
                    "remote_campaign_id": remote_campaign_id.as_str(),
                    "pending_publish": null,
                    "modified_at": new_modified_at
                } },
                None,
            )
            .await?;

        if result.matched_count == 0 {
            return Err(Error::ConcurrentModificationDetected);
        }

        campaign.modified_at = now;
        campaign.status = CampaignStatus::Published;
        campaign.remote_campaign_id = Some(remote_campaign_id);
        campaign.pending_publish = None;

        Ok(campaign)
    }

    #[tracing::instrument(skip(self))]
    async fn update_campaign_status(
        &self,
        mut campaign: Campaign,
        status: CampaignStatus,
    ) -> Result<Campaign, Error> {
        let now = Utc::now();
        let old_modified_at = bson::DateTime::from_chrono(campaign.modified_at);
        let new_modified_at = bson::DateTime::from_chrono(now);
        let new_status = bson::to_bson(&status)?;

        let result = self
            .update_one(
                bson::doc! { "_id": campaign.id, "modified_at": old_modified_at },
                bson::doc! { "$set": { "status": new_status, "modified_at": new_modified_at } },
                None,
            )
            .await?;

        if result.matched_count == 0 {
            return Err(Error::ConcurrentModificationDetected);
        }

        campaign.modified_at = now;
        campaign.status = status;

        Ok(campaign)
    }
}
