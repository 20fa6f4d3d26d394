use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::GoogleAdsSettings;
use crate::error::Error;

use super::wire::{self, CreateOperation, MutateOperation, UpdateOperation, PAUSED};
use super::{AdsGateway, ResourceName, ResponsiveSearchAd, SearchCampaignRequest};

const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Talks to the Google Ads REST API with an OAuth2 refresh token. Access
/// tokens are cached until shortly before they expire.
pub struct GoogleAdsGateway {
    client: Client,
    credentials: Credentials,
    api_url: String,
    token_url: String,
    token: Mutex<Option<AccessToken>>,
}

struct Credentials {
    developer_token: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    login_customer_id: String,
    customer_id: String,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl GoogleAdsGateway {
    pub fn new(settings: &GoogleAdsSettings) -> Result<GoogleAdsGateway, Error> {
        let credentials = match (
            &settings.developer_token,
            &settings.client_id,
            &settings.client_secret,
            &settings.refresh_token,
            &settings.login_customer_id,
            &settings.customer_id,
        ) {
            (
                Some(developer_token),
                Some(client_id),
                Some(client_secret),
                Some(refresh_token),
                Some(login_customer_id),
                Some(customer_id),
            ) => Credentials {
                developer_token: developer_token.clone(),
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                refresh_token: refresh_token.clone(),
                login_customer_id: digits(login_customer_id),
                customer_id: digits(customer_id),
            },
            _ => {
                return Err(Error::GatewayNotConfigured {
                    missing: settings.missing_credentials(),
                })
            }
        };

        Ok(GoogleAdsGateway {
            client: Client::new(),
            credentials,
            api_url: settings.api_url.trim_end_matches('/').to_owned(),
            token_url: settings.token_url.clone(),
            token: Mutex::new(None),
        })
    }

    fn customer(&self) -> String {
        format!("customers/{}", self.credentials.customer_id)
    }

    async fn access_token(&self) -> Result<String, Error> {
        let mut token = self.token.lock().await;
        if let Some(token) = token.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .client
            .post(&self.token_url)
            .form(&wire::TokenRequest {
                grant_type: "refresh_token",
                client_id: &self.credentials.client_id,
                client_secret: &self.credentials.client_secret,
                refresh_token: &self.credentials.refresh_token,
            })
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<wire::TokenError>(&body) {
                Ok(err) => Error::GatewayRejectedRequest {
                    details: err.describe(),
                },
                Err(_) => {
                    warn!(%status, "token exchange failed without an error body");
                    Error::GatewayUnavailable
                }
            });
        }

        let body: wire::TokenResponse = parse(response).await?;
        let value = body.access_token.clone();
        *token = Some(AccessToken {
            value: body.access_token,
            expires_at: Instant::now()
                + Duration::from_secs(body.expires_in).min(MAX_TOKEN_LIFETIME),
        });

        Ok(value)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, Error>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned + Send,
    {
        let token = self.access_token().await?;
        let url = format!("{}/{}/{}", self.api_url, self.customer(), path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("developer-token", &self.credentials.developer_token)
            .header("login-customer-id", &self.credentials.login_customer_id)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return parse(response).await;
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<wire::ErrorEnvelope>(&body)
            .ok()
            .and_then(|envelope| envelope.error.describe())
        {
            Some(details) => Err(Error::GatewayRejectedRequest { details }),
            None => {
                warn!(%status, %url, "platform failed without an error body");
                Err(Error::GatewayUnavailable)
            }
        }
    }

    async fn mutate<T>(&self, path: &str, operation: T) -> Result<ResourceName, Error>
    where
        T: Serialize + Send + Sync,
    {
        let request = wire::MutateRequest {
            operations: vec![operation],
        };
        let response: wire::MutateResponse = self.post(path, &request).await?;

        response
            .results
            .into_iter()
            .map(|result| result.resource_name)
            .find(|name| !name.is_empty())
            .ok_or_else(|| {
                warn!(%path, "platform response had no resource name");
                Error::GatewayUnavailable
            })
    }
}

#[async_trait]
impl AdsGateway for GoogleAdsGateway {
    #[tracing::instrument(skip(self))]
    async fn create_budget(&self, name: &str, amount_micros: i64) -> Result<ResourceName, Error> {
        self.mutate(
            "campaignBudgets:mutate",
            CreateOperation {
                create: budget(None, name, amount_micros),
            },
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn create_campaign(&self, name: &str, budget: &str) -> Result<ResourceName, Error> {
        self.mutate(
            "campaigns:mutate",
            CreateOperation {
                create: search_campaign(None, name, budget),
            },
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn create_ad_group(&self, campaign: &str, name: &str) -> Result<ResourceName, Error> {
        self.mutate(
            "adGroups:mutate",
            CreateOperation {
                create: ad_group(None, name, campaign),
            },
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn create_ad(
        &self,
        ad_group: &str,
        ad: &ResponsiveSearchAd,
    ) -> Result<ResourceName, Error> {
        self.mutate(
            "adGroupAds:mutate",
            CreateOperation {
                create: ad_group_ad(ad_group, ad),
            },
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn pause_campaign(&self, campaign: &str) -> Result<(), Error> {
        self.mutate(
            "campaigns:mutate",
            UpdateOperation {
                update: wire::CampaignStatusUpdate {
                    resource_name: campaign.to_owned(),
                    status: PAUSED,
                },
                update_mask: "status",
            },
        )
        .await?;

        info!(%campaign, "paused remote campaign");

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn publish_search_campaign(
        &self,
        request: &SearchCampaignRequest,
    ) -> Result<ResourceName, Error> {
        // temporary ids link the operations inside one atomic batch
        let customer = self.customer();
        let budget_name = format!("{}/campaignBudgets/-1", customer);
        let campaign_name = format!("{}/campaigns/-2", customer);
        let ad_group_name = format!("{}/adGroups/-3", customer);

        let batch = wire::GoogleAdsMutateRequest {
            mutate_operations: vec![
                MutateOperation::CampaignBudgetOperation(CreateOperation {
                    create: budget(
                        Some(budget_name.clone()),
                        &request.budget_name,
                        request.daily_budget_micros,
                    ),
                }),
                MutateOperation::CampaignOperation(CreateOperation {
                    create: search_campaign(
                        Some(campaign_name.clone()),
                        &request.campaign_name,
                        &budget_name,
                    ),
                }),
                MutateOperation::AdGroupOperation(CreateOperation {
                    create: ad_group(
                        Some(ad_group_name.clone()),
                        &request.ad_group_name,
                        &campaign_name,
                    ),
                }),
                MutateOperation::AdGroupAdOperation(CreateOperation {
                    create: ad_group_ad(&ad_group_name, &request.ad),
                }),
            ],
        };

        let response: wire::GoogleAdsMutateResponse =
            self.post("googleAds:mutate", &batch).await?;

        let resource_name = response
            .mutate_operation_responses
            .into_iter()
            .filter_map(|result| result.campaign_result)
            .map(|result| result.resource_name)
            .find(|name| !name.is_empty())
            .ok_or_else(|| {
                warn!("batch response had no campaign result");
                Error::GatewayUnavailable
            })?;

        info!(%resource_name, "published remote campaign");

        Ok(resource_name)
    }
}

fn budget(resource_name: Option<String>, name: &str, amount_micros: i64) -> wire::CampaignBudget {
    wire::CampaignBudget {
        resource_name,
        name: name.to_owned(),
        amount_micros: amount_micros.to_string(),
        delivery_method: "STANDARD",
    }
}

fn search_campaign(resource_name: Option<String>, name: &str, budget: &str) -> wire::Campaign {
    wire::Campaign {
        resource_name,
        name: name.to_owned(),
        campaign_budget: budget.to_owned(),
        status: PAUSED,
        advertising_channel_type: "SEARCH",
        manual_cpc: wire::ManualCpc {},
    }
}

fn ad_group(resource_name: Option<String>, name: &str, campaign: &str) -> wire::AdGroup {
    wire::AdGroup {
        resource_name,
        name: name.to_owned(),
        campaign: campaign.to_owned(),
        status: PAUSED,
        ad_group_type: "SEARCH_STANDARD",
    }
}

fn ad_group_ad(ad_group: &str, ad: &ResponsiveSearchAd) -> wire::AdGroupAd {
    let assets = |texts: &[String]| {
        texts
            .iter()
            .map(|text| wire::AdTextAsset { text: text.clone() })
            .collect()
    };

    wire::AdGroupAd {
        ad_group: ad_group.to_owned(),
        status: PAUSED,
        ad: wire::Ad {
            final_urls: vec![ad.final_url.clone()],
            responsive_search_ad: wire::ResponsiveSearchAdInfo {
                headlines: assets(&ad.headlines),
                descriptions: assets(&ad.descriptions),
            },
        },
    }
}

async fn parse<R: DeserializeOwned>(response: Response) -> Result<R, Error> {
    response.json::<R>().await.map_err(|err| {
        warn!("could not parse platform response: {}", err);
        Error::GatewayUnavailable
    })
}

fn transport_error(err: reqwest::Error) -> Error {
    warn!("could not reach platform: {}", err);
    Error::GatewayUnavailable
}

fn digits(id: &str) -> String {
    id.chars().filter(char::is_ascii_digit).collect()
}
