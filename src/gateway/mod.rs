use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::GoogleAdsSettings;
use crate::error::Error;

pub mod google;
mod wire;

pub use google::GoogleAdsGateway;

/// Fully qualified platform resource, e.g. `customers/123/campaigns/456`.
pub type ResourceName = String;

/// What the advertising platform can do for us. Implementations never retry;
/// every failure comes back as one of the `Gateway*` errors.
#[async_trait]
pub trait AdsGateway: Send + Sync {
    async fn create_budget(&self, name: &str, amount_micros: i64) -> Result<ResourceName, Error>;

    /// The campaign is created paused.
    async fn create_campaign(&self, name: &str, budget: &str) -> Result<ResourceName, Error>;

    async fn create_ad_group(&self, campaign: &str, name: &str) -> Result<ResourceName, Error>;

    async fn create_ad(
        &self,
        ad_group: &str,
        ad: &ResponsiveSearchAd,
    ) -> Result<ResourceName, Error>;

    async fn pause_campaign(&self, campaign: &str) -> Result<(), Error>;

    /// Creates budget, campaign, ad group and ad as one unit: either all of
    /// them exist afterwards or none do. Returns the campaign's resource name.
    async fn publish_search_campaign(
        &self,
        request: &SearchCampaignRequest,
    ) -> Result<ResourceName, Error>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchCampaignRequest {
    pub campaign_name: String,
    pub budget_name: String,
    pub daily_budget_micros: i64,
    pub ad_group_name: String,
    pub ad: ResponsiveSearchAd,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResponsiveSearchAd {
    pub headlines: Vec<String>,
    pub descriptions: Vec<String>,
    pub final_url: String,
}

/// Builds the platform gateway, or a stand-in that fails every call when the
/// credentials are incomplete, so campaigns can still be drafted.
pub fn connect(settings: &GoogleAdsSettings) -> Arc<dyn AdsGateway> {
    match GoogleAdsGateway::new(settings) {
        Ok(gateway) => Arc::new(gateway),
        Err(err) => {
            tracing::warn!("publishing is disabled: {}", err);
            Arc::new(UnconfiguredGateway {
                missing: settings.missing_credentials(),
            })
        }
    }
}

#[derive(Debug)]
pub struct UnconfiguredGateway {
    missing: Vec<&'static str>,
}

impl UnconfiguredGateway {
    fn fail<T>(&self) -> Result<T, Error> {
        Err(Error::GatewayNotConfigured {
            missing: self.missing.clone(),
        })
    }
}

#[async_trait]
impl AdsGateway for UnconfiguredGateway {
    async fn create_budget(&self, _name: &str, _amount_micros: i64) -> Result<ResourceName, Error> {
        self.fail()
    }

    async fn create_campaign(&self, _name: &str, _budget: &str) -> Result<ResourceName, Error> {
        self.fail()
    }

    async fn create_ad_group(&self, _campaign: &str, _name: &str) -> Result<ResourceName, Error> {
        self.fail()
    }

    async fn create_ad(
        &self,
        _ad_group: &str,
        _ad: &ResponsiveSearchAd,
    ) -> Result<ResourceName, Error> {
        self.fail()
    }

    async fn pause_campaign(&self, _campaign: &str) -> Result<(), Error> {
        self.fail()
    }

    async fn publish_search_campaign(
        &self,
        _request: &SearchCampaignRequest,
    ) -> Result<ResourceName, Error> {
        self.fail()
    }
}

#[cfg(test)]
pub mod test {
    use std::sync::Mutex;

    use super::*;

    type Hook<Args, Output> = Box<dyn Fn(Args) -> Result<Output, Error> + Send + Sync>;

    /// Records every call it receives; the publish and pause hooks decide the
    /// outcome. Other calls panic.
    pub struct MockGateway {
        pub on_publish_search_campaign: Hook<SearchCampaignRequest, ResourceName>,
        pub on_pause_campaign: Hook<String, ()>,
        pub calls: Mutex<Vec<String>>,
    }

    impl MockGateway {
        pub fn new() -> MockGateway {
            MockGateway {
                on_publish_search_campaign: Box::new(|_| {
                    panic!("unexpected call to publish_search_campaign")
                }),
                on_pause_campaign: Box::new(|_| panic!("unexpected call to pause_campaign")),
                calls: Mutex::new(vec![]),
            }
        }

        /// Publishes succeed with a fixed resource name and pauses succeed.
        pub fn accepting() -> MockGateway {
            let mut gateway = MockGateway::new();
            gateway.on_publish_search_campaign =
                Box::new(|_| Ok("customers/1234567890/campaigns/42".to_string()));
            gateway.on_pause_campaign = Box::new(|_| Ok(()));
            gateway
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl AdsGateway for MockGateway {
        async fn create_budget(&self, name: &str, _amount_micros: i64) -> Result<ResourceName, Error> {
            panic!("unexpected call to create_budget({})", name)
        }

        async fn create_campaign(&self, name: &str, _budget: &str) -> Result<ResourceName, Error> {
            panic!("unexpected call to create_campaign({})", name)
        }

        async fn create_ad_group(&self, _campaign: &str, name: &str) -> Result<ResourceName, Error> {
            panic!("unexpected call to create_ad_group({})", name)
        }

        async fn create_ad(
            &self,
            ad_group: &str,
            _ad: &ResponsiveSearchAd,
        ) -> Result<ResourceName, Error> {
            panic!("unexpected call to create_ad({})", ad_group)
        }

        async fn pause_campaign(&self, campaign: &str) -> Result<(), Error> {
            self.record(format!("pause_campaign({})", campaign));
            (self.on_pause_campaign)(campaign.to_string())
        }

        async fn publish_search_campaign(
            &self,
            request: &SearchCampaignRequest,
        ) -> Result<ResourceName, Error> {
            self.record(format!("publish_search_campaign({})", request.campaign_name));
            (self.on_publish_search_campaign)(request.clone())
        }
    }

    #[tokio::test]
    async fn unconfigured_gateway_fails_before_any_remote_call() {
        let gateway = connect(&GoogleAdsSettings::default());

        let result = gateway.pause_campaign("customers/1/campaigns/2").await;

        assert_eq!(
            result.unwrap_err(),
            Error::GatewayNotConfigured {
                missing: vec![
                    "GOOGLE_ADS_DEVELOPER_TOKEN",
                    "GOOGLE_ADS_CLIENT_ID",
                    "GOOGLE_ADS_CLIENT_SECRET",
                    "GOOGLE_ADS_REFRESH_TOKEN",
                    "GOOGLE_ADS_LOGIN_CUSTOMER_ID",
                    "GOOGLE_ADS_CUSTOMER_ID",
                ]
            }
        );
    }
}
