use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::{error, info, warn};

use crate::config::PublishSettings;
use crate::database::Database;
use crate::error::Error;
use crate::gateway::{AdsGateway, ResponsiveSearchAd, SearchCampaignRequest};

use super::{Campaign, CampaignId, CampaignStatus, PendingPublish};

const MICROS_PER_UNIT: i64 = 1_000_000;
const RELEASE_ATTEMPTS: u32 = 2;
const DEFAULT_FINAL_URL: &str = "https://example.com";
const SYNTHETIC_HEADLINE_SUFFIX: &str = " – Official";
const SYNTHETIC_HEADLINE: &str = "Get Started Today";
const SYNTHETIC_DESCRIPTION: &str = "Simple. Fast. Reliable.";
const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Everything a caller may send when drafting a campaign. Presence is checked
/// by [`create_campaign`] so the first missing field can be named.
#[derive(Clone, Debug, Default)]
pub struct CampaignDraft {
    pub name: Option<String>,
    pub objective: Option<String>,
    pub campaign_type: Option<String>,
    pub daily_budget: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub ad_group_name: Option<String>,
    pub ad_headline: Option<String>,
    pub ad_description: Option<String>,
    pub asset_url: Option<String>,
}

#[tracing::instrument(skip(db))]
pub async fn create_campaign(db: &dyn Database, draft: CampaignDraft) -> Result<Campaign, Error> {
    let name = required("name", draft.name)?;
    let objective = required("objective", draft.objective)?;
    let campaign_type = required("campaign_type", draft.campaign_type)?;
    let daily_budget = required("daily_budget", draft.daily_budget)?;
    let start_date = required("start_date", draft.start_date)?;
    let ad_group_name = required("ad_group_name", draft.ad_group_name)?;
    let ad_headline = required("ad_headline", draft.ad_headline)?;
    let ad_description = required("ad_description", draft.ad_description)?;

    if daily_budget <= 0 {
        return Err(Error::InvalidDailyBudget { daily_budget });
    }
    budget_micros(daily_budget)?;

    let start_date = parse_date("start_date", &start_date)?;
    let end_date = match draft.end_date {
        Some(end_date) if !end_date.is_empty() => Some(parse_date("end_date", &end_date)?),
        _ => None,
    };

    if let Some(end_date) = end_date {
        if end_date < start_date {
            warn!(%start_date, %end_date, "campaign ends before it starts");
        }
    }

    let now = Utc::now();
    let campaign = Campaign {
        id: CampaignId::new(),
        name,
        objective,
        campaign_type,
        daily_budget,
        start_date,
        end_date,
        status: CampaignStatus::Draft,
        remote_campaign_id: None,
        ad_group_name,
        ad_headline,
        ad_description,
        asset_url: draft.asset_url,
        pending_publish: None,
        created_at: now,
        modified_at: now,
    };

    db.campaigns().insert_campaign(&campaign).await?;

    info!(campaign_id = %campaign.id, "drafted campaign");

    Ok(campaign)
}

#[tracing::instrument(skip(db))]
pub async fn get_campaigns(db: &dyn Database) -> Result<Vec<Campaign>, Error> {
    let campaigns = db.campaigns().fetch_campaigns().await?;

    Ok(campaigns)
}

#[tracing::instrument(skip(db))]
pub async fn get_campaign_by_id(
    db: &dyn Database,
    campaign_id: CampaignId,
) -> Result<Campaign, Error> {
    let campaign = db
        .campaigns()
        .fetch_campaign_by_id(campaign_id)
        .await?
        .ok_or(Error::CampaignNotFound { campaign_id })?;

    Ok(campaign)
}

/// Creates the campaign on the platform and flips it to PUBLISHED.
///
/// The campaign is claimed with a pending-publish marker before the platform
/// is called. If the platform fails, the marker is cleared and the campaign is
/// left as it was. If the platform succeeds but the final write fails, the
/// marker stays behind so the campaign can't be published again until the
/// claim times out.
#[tracing::instrument(skip(db, gateway))]
pub async fn publish_campaign(
    db: &dyn Database,
    gateway: &dyn AdsGateway,
    settings: &PublishSettings,
    campaign_id: CampaignId,
) -> Result<Campaign, Error> {
    let campaign = get_campaign_by_id(db, campaign_id).await?;

    if !campaign.status.can_publish() {
        return Err(Error::CampaignNotDraft {
            campaign_id,
            status: campaign.status,
        });
    }

    if let Some(pending) = &campaign.pending_publish {
        if Utc::now() < pending.started_at + settings.claim_timeout {
            return Err(Error::PublishAlreadyInProgress {
                campaign_id,
                started_at: pending.started_at,
            });
        }

        warn!(
            %campaign_id,
            started_at = %pending.started_at,
            "taking over abandoned publish claim"
        );
    }

    let request = search_campaign_request(&campaign)?;

    let pending = PendingPublish {
        started_at: Utc::now(),
    };
    let campaign = db
        .campaigns()
        .update_campaign_pending_publish(campaign, Some(pending))
        .await?;

    let remote_campaign_id = match gateway.publish_search_campaign(&request).await {
        Ok(remote_campaign_id) => remote_campaign_id,
        Err(err) => {
            release_claim(db, campaign).await;
            return Err(err);
        }
    };

    let campaign = db
        .campaigns()
        .update_campaign_published(campaign, remote_campaign_id.clone())
        .await
        .map_err(|err| {
            error!(
                %campaign_id,
                %remote_campaign_id,
                "remote campaign exists but could not be recorded: {}",
                err
            );
            err
        })?;

    info!(%campaign_id, %remote_campaign_id, "published campaign");

    Ok(campaign)
}

#[tracing::instrument(skip(db, gateway))]
pub async fn pause_campaign(
    db: &dyn Database,
    gateway: &dyn AdsGateway,
    campaign_id: CampaignId,
) -> Result<Campaign, Error> {
    let campaign = get_campaign_by_id(db, campaign_id).await?;

    let remote_campaign_id = match &campaign.remote_campaign_id {
        Some(remote_campaign_id) if !remote_campaign_id.is_empty() => remote_campaign_id.clone(),
        _ => return Err(Error::CampaignNotPublished { campaign_id }),
    };

    gateway.pause_campaign(&remote_campaign_id).await?;

    let campaign = db
        .campaigns()
        .update_campaign_status(campaign, CampaignStatus::Paused)
        .await
        .map_err(|err| {
            error!(
                %campaign_id,
                %remote_campaign_id,
                "remote campaign is paused but could not be recorded: {}",
                err
            );
            err
        })?;

    info!(%campaign_id, "paused campaign");

    Ok(campaign)
}

/// The platform request for a draft, including the fixed extra headlines and
/// description every published ad carries.
pub fn search_campaign_request(campaign: &Campaign) -> Result<SearchCampaignRequest, Error> {
    let daily_budget_micros = budget_micros(campaign.daily_budget)?;

    Ok(SearchCampaignRequest {
        campaign_name: campaign.name.clone(),
        budget_name: format!("{} Budget", campaign.name),
        daily_budget_micros,
        ad_group_name: campaign.ad_group_name.clone(),
        ad: ResponsiveSearchAd {
            headlines: vec![
                campaign.ad_headline.clone(),
                format!("{}{}", campaign.ad_headline, SYNTHETIC_HEADLINE_SUFFIX),
                SYNTHETIC_HEADLINE.to_owned(),
            ],
            descriptions: vec![
                campaign.ad_description.clone(),
                SYNTHETIC_DESCRIPTION.to_owned(),
            ],
            final_url: campaign
                .asset_url
                .clone()
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| DEFAULT_FINAL_URL.to_owned()),
        },
    })
}

/// Clears the pending-publish marker after a failed publish. Gives up after a
/// second failed write; the claim then times out on its own.
async fn release_claim(db: &dyn Database, campaign: Campaign) {
    let campaign_id = campaign.id;

    for attempt in 1..=RELEASE_ATTEMPTS {
        match db
            .campaigns()
            .update_campaign_pending_publish(campaign.clone(), None)
            .await
        {
            Ok(_) => return,
            Err(err) => {
                error!(%campaign_id, attempt, "could not release publish claim: {}", err);
            }
        }
    }
}

fn budget_micros(daily_budget: i64) -> Result<i64, Error> {
    daily_budget
        .checked_mul(MICROS_PER_UNIT)
        .ok_or(Error::DailyBudgetTooLarge {
            daily_budget,
            max: i64::MAX / MICROS_PER_UNIT,
        })
}

fn required<T>(field: &'static str, value: Option<T>) -> Result<T, Error> {
    value.ok_or(Error::MissingField { field })
}

/// Accepts a calendar date, or an ISO 8601 timestamp (`T` or space between
/// date and time, optional seconds, optional offset) whose date part is kept.
fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, Error> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }

    let with_offset = TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(value, &format!("{}%:z", format)).ok())
        .map(|dt| dt.date_naive());
    let naive = || {
        TIMESTAMP_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
            .map(|dt| dt.date())
    };

    with_offset
        .or_else(naive)
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
        .ok_or(Error::InvalidDate {
            field,
            value: value.to_owned(),
        })
}
