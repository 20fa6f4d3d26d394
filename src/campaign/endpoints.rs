use actix_web::web::{Data, Json, Path};
use actix_web::{get, post, HttpResponse};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PublishSettings;
use crate::database::Database;
use crate::error::Error;
use crate::gateway::AdsGateway;

use super::manager::{self, CampaignDraft};
use super::{Campaign, CampaignId, CampaignStatus};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CreateCampaignBody {
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

impl From<CreateCampaignBody> for CampaignDraft {
    fn from(body: CreateCampaignBody) -> CampaignDraft {
        CampaignDraft {
            name: body.name,
            objective: body.objective,
            campaign_type: body.campaign_type,
            daily_budget: body.daily_budget,
            start_date: body.start_date,
            end_date: body.end_date,
            ad_group_name: body.ad_group_name,
            ad_headline: body.ad_headline,
            ad_description: body.ad_description,
            asset_url: body.asset_url,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CampaignStatusBody {
    pub id: CampaignId,
    pub status: CampaignStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_campaign_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CampaignSummaryBody {
    pub id: CampaignId,
    pub name: String,
    pub objective: String,
    pub campaign_type: String,
    pub daily_budget: i64,
    pub status: CampaignStatus,
    pub remote_campaign_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CampaignSummaryBody {
    pub fn render(campaign: Campaign) -> CampaignSummaryBody {
        CampaignSummaryBody {
            id: campaign.id,
            name: campaign.name,
            objective: campaign.objective,
            campaign_type: campaign.campaign_type,
            daily_budget: campaign.daily_budget,
            status: campaign.status,
            remote_campaign_id: campaign.remote_campaign_id,
            created_at: campaign.created_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CampaignBody {
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
    pub publish_pending_since: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl CampaignBody {
    pub fn render(campaign: Campaign) -> CampaignBody {
        CampaignBody {
            id: campaign.id,
            name: campaign.name,
            objective: campaign.objective,
            campaign_type: campaign.campaign_type,
            daily_budget: campaign.daily_budget,
            start_date: campaign.start_date,
            end_date: campaign.end_date,
            status: campaign.status,
            remote_campaign_id: campaign.remote_campaign_id,
            ad_group_name: campaign.ad_group_name,
            ad_headline: campaign.ad_headline,
            ad_description: campaign.ad_description,
            asset_url: campaign.asset_url,
            publish_pending_since: campaign.pending_publish.map(|p| p.started_at),
            created_at: campaign.created_at,
            modified_at: campaign.modified_at,
        }
    }
}

#[post("/campaigns")]
#[tracing::instrument(skip(db))]
pub async fn create_campaign(
    db: Data<dyn Database>,
    body: Json<CreateCampaignBody>,
) -> Result<HttpResponse, Error> {
    let body = body.into_inner();

    let campaign = manager::create_campaign(&**db, body.into()).await?;

    Ok(HttpResponse::Created().json(CampaignStatusBody {
        id: campaign.id,
        status: campaign.status,
        remote_campaign_id: None,
    }))
}

#[get("/campaigns")]
#[tracing::instrument(skip(db))]
pub async fn get_campaigns(db: Data<dyn Database>) -> Result<Json<Vec<CampaignSummaryBody>>, Error> {
    let campaigns = manager::get_campaigns(&**db).await?;

    let body = campaigns
        .into_iter()
        .map(CampaignSummaryBody::render)
        .collect();

    Ok(Json(body))
}

#[get("/campaigns/{campaign_id}")]
#[tracing::instrument(skip(db))]
pub async fn get_campaign_by_id(
    db: Data<dyn Database>,
    params: Path<CampaignId>,
) -> Result<Json<CampaignBody>, Error> {
    let campaign_id = params.into_inner();

    let campaign = manager::get_campaign_by_id(&**db, campaign_id).await?;

    Ok(Json(CampaignBody::render(campaign)))
}

#[post("/campaigns/{campaign_id}/publish")]
#[tracing::instrument(skip(db, gateway, settings))]
pub async fn publish_campaign(
    db: Data<dyn Database>,
    gateway: Data<dyn AdsGateway>,
    settings: Data<PublishSettings>,
    params: Path<CampaignId>,
) -> Result<Json<CampaignStatusBody>, Error> {
    let campaign_id = params.into_inner();

    let campaign = manager::publish_campaign(&**db, &**gateway, &settings, campaign_id).await?;

    Ok(Json(CampaignStatusBody {
        id: campaign.id,
        status: campaign.status,
        remote_campaign_id: campaign.remote_campaign_id,
    }))
}

#[post("/campaigns/{campaign_id}/pause")]
#[tracing::instrument(skip(db, gateway))]
pub async fn pause_campaign(
    db: Data<dyn Database>,
    gateway: Data<dyn AdsGateway>,
    params: Path<CampaignId>,
) -> Result<Json<CampaignStatusBody>, Error> {
    let campaign_id = params.into_inner();

    let campaign = manager::pause_campaign(&**db, &**gateway, campaign_id).await?;

    Ok(Json(CampaignStatusBody {
        id: campaign.id,
        status: campaign.status,
        remote_campaign_id: None,
    }))
}
