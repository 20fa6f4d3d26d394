//! JSON shapes of the Google Ads REST API, limited to what publishing and
//! pausing a search campaign needs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PAUSED: &str = "PAUSED";

#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    pub grant_type: &'static str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
pub struct TokenError {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl TokenError {
    pub fn describe(&self) -> String {
        match &self.error_description {
            Some(description) => format!("{}: {}", self.error, description),
            None => self.error.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MutateRequest<T> {
    pub operations: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct CreateOperation<T> {
    pub create: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOperation<T> {
    pub update: T,
    pub update_mask: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignBudget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    pub name: String,
    pub amount_micros: String,
    pub delivery_method: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    pub name: String,
    pub campaign_budget: String,
    pub status: &'static str,
    pub advertising_channel_type: &'static str,
    pub manual_cpc: ManualCpc,
}

#[derive(Debug, Serialize)]
pub struct ManualCpc {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignStatusUpdate {
    pub resource_name: String,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    pub name: String,
    pub campaign: String,
    pub status: &'static str,
    #[serde(rename = "type")]
    pub ad_group_type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdGroupAd {
    pub ad_group: String,
    pub status: &'static str,
    pub ad: Ad,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ad {
    pub final_urls: Vec<String>,
    pub responsive_search_ad: ResponsiveSearchAdInfo,
}

#[derive(Debug, Serialize)]
pub struct ResponsiveSearchAdInfo {
    pub headlines: Vec<AdTextAsset>,
    pub descriptions: Vec<AdTextAsset>,
}

#[derive(Debug, Serialize)]
pub struct AdTextAsset {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAdsMutateRequest {
    pub mutate_operations: Vec<MutateOperation>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MutateOperation {
    CampaignBudgetOperation(CreateOperation<CampaignBudget>),
    CampaignOperation(CreateOperation<Campaign>),
    AdGroupOperation(CreateOperation<AdGroup>),
    AdGroupAdOperation(CreateOperation<AdGroupAd>),
}

#[derive(Debug, Deserialize)]
pub struct MutateResponse {
    #[serde(default)]
    pub results: Vec<MutateResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutateResult {
    #[serde(default)]
    pub resource_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAdsMutateResponse {
    #[serde(default)]
    pub mutate_operation_responses: Vec<MutateOperationResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutateOperationResponse {
    #[serde(default)]
    pub campaign_result: Option<MutateResult>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorStatus,
}

#[derive(Debug, Deserialize)]
pub struct ErrorStatus {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub errors: Vec<AdsError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdsError {
    #[serde(default)]
    pub error_code: BTreeMap<String, Value>,
    #[serde(default)]
    pub message: String,
}

impl ErrorStatus {
    /// `<code>: <message>` for every platform error, joined by ` | `. Falls
    /// back to the top-level message when the platform sent no error list.
    pub fn describe(&self) -> Option<String> {
        let messages: Vec<String> = self
            .details
            .iter()
            .flat_map(|detail| detail.errors.iter())
            .map(|error| format!("{}: {}", error.code(), error.message))
            .collect();

        if !messages.is_empty() {
            Some(messages.join(" | "))
        } else if !self.message.is_empty() {
            Some(self.message.clone())
        } else {
            None
        }
    }
}

impl AdsError {
    fn code(&self) -> String {
        let codes: Vec<String> = self
            .error_code
            .values()
            .map(|value| match value {
                Value::String(code) => code.clone(),
                other => other.to_string(),
            })
            .collect();

        if codes.is_empty() {
            "UNKNOWN".to_string()
        } else {
            codes.join(",")
        }
    }
}
