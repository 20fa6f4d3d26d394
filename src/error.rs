use std::fmt::{Debug, Display};
use std::io::Error as IoError;

use actix_web::body::BoxBody;
use actix_web::error::JsonPayloadError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use chrono::{DateTime, Utc};
use derivative::Derivative;
use mongodb::bson::ser::Error as BsonError;
use mongodb::error::{Error as DatabaseError, ErrorKind as DatabaseErrorKind};
use serde::{Serialize, Serializer};

use crate::campaign::{CampaignId, CampaignStatus};

#[derive(Debug, Serialize, Derivative)]
#[derivative(PartialEq, Eq)]
#[serde(untagged)]
pub enum Error {
    // 400
    #[serde(serialize_with = "display")]
    InvalidJson(#[derivative(PartialEq = "ignore")] JsonPayloadError),
    InvalidDate {
        field: &'static str,
        value: String,
    },

    // 404
    PathNotFound,
    CampaignNotFound {
        campaign_id: CampaignId,
    },

    // 409
    ConcurrentModificationDetected,
    PublishAlreadyInProgress {
        campaign_id: CampaignId,
        started_at: DateTime<Utc>,
    },

    // 422
    MissingField {
        field: &'static str,
    },
    InvalidDailyBudget {
        daily_budget: i64,
    },
    DailyBudgetTooLarge {
        daily_budget: i64,
        max: i64,
    },
    CampaignNotDraft {
        campaign_id: CampaignId,
        status: CampaignStatus,
    },
    CampaignNotPublished {
        campaign_id: CampaignId,
    },

    // 502
    GatewayNotConfigured {
        missing: Vec<&'static str>,
    },
    GatewayRejectedRequest {
        details: String,
    },
    GatewayUnavailable,

    // 503
    #[serde(serialize_with = "display")]
    DatabaseUnavailable(#[derivative(PartialEq = "ignore")] DatabaseError),

    // 500
    #[serde(serialize_with = "display")]
    FailedDatabaseCall(#[derivative(PartialEq = "ignore")] DatabaseError),
    #[serde(serialize_with = "display")]
    FailedToSerializeToBson(#[derivative(PartialEq = "ignore")] BsonError),
    #[serde(serialize_with = "display")]
    IoError(#[derivative(PartialEq = "ignore")] IoError),
}

impl Error {
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidJson(_) => "E4001000",
            Error::InvalidDate { .. } => "E4001003",
            Error::PathNotFound => "E4041000",
            Error::CampaignNotFound { .. } => "E4041001",
            Error::ConcurrentModificationDetected => "E4091000",
            Error::PublishAlreadyInProgress { .. } => "E4091001",
            Error::MissingField { .. } => "E4221000",
            Error::InvalidDailyBudget { .. } => "E4221001",
            Error::CampaignNotDraft { .. } => "E4221002",
            Error::CampaignNotPublished { .. } => "E4221003",
            Error::DailyBudgetTooLarge { .. } => "E4221004",
            Error::GatewayNotConfigured { .. } => "E5021000",
            Error::GatewayRejectedRequest { .. } => "E5021001",
            Error::GatewayUnavailable => "E5021002",
            Error::DatabaseUnavailable(_) => "E5031000",
            Error::FailedDatabaseCall(_) => "E5001000",
            Error::FailedToSerializeToBson(_) => "E5001001",
            Error::IoError(_) => "E5001002",
        }
    }

    pub fn error_message(&self) -> String {
        match self {
            Error::InvalidJson(_) => "Invalid JSON body".into(),
            Error::InvalidDate { field, value } => {
                format!("Invalid date for {}: {:?}", field, value)
            }
            Error::PathNotFound => "Endpoint not found".into(),
            Error::CampaignNotFound { .. } => "Campaign not found".into(),
            Error::ConcurrentModificationDetected => {
                "The server detected a concurrent modification".into()
            }
            Error::PublishAlreadyInProgress { .. } => {
                "A publish is already in progress for this campaign".into()
            }
            Error::MissingField { field } => format!("Missing field: {}", field),
            Error::InvalidDailyBudget { .. } => "daily_budget must be a positive integer".into(),
            Error::DailyBudgetTooLarge { max, .. } => {
                format!("daily_budget must not exceed {}", max)
            }
            Error::CampaignNotDraft { .. } => "Only DRAFT campaigns can be published".into(),
            Error::CampaignNotPublished { .. } => "Campaign not published to Google Ads".into(),
            Error::GatewayNotConfigured { .. } => {
                "Google Ads credentials are not fully configured".into()
            }
            Error::GatewayRejectedRequest { details } => details.clone(),
            Error::GatewayUnavailable => "Google Ads service unavailable".into(),
            Error::DatabaseUnavailable(_) => "Database unavailable".into(),
            Error::FailedDatabaseCall(_) => {
                "An error occurred when communicating with the database".into()
            }
            Error::FailedToSerializeToBson(_) => {
                "An error occurred when serializing an object to bson".into()
            }
            Error::IoError(_) => "An error occurred during an I/O operation".into(),
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidJson(_) => StatusCode::BAD_REQUEST,
            Error::InvalidDate { .. } => StatusCode::BAD_REQUEST,
            Error::PathNotFound => StatusCode::NOT_FOUND,
            Error::CampaignNotFound { .. } => StatusCode::NOT_FOUND,
            Error::ConcurrentModificationDetected => StatusCode::CONFLICT,
            Error::PublishAlreadyInProgress { .. } => StatusCode::CONFLICT,
            Error::MissingField { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::InvalidDailyBudget { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::DailyBudgetTooLarge { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::CampaignNotDraft { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::CampaignNotPublished { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::GatewayNotConfigured { .. } => StatusCode::BAD_GATEWAY,
            Error::GatewayRejectedRequest { .. } => StatusCode::BAD_GATEWAY,
            Error::GatewayUnavailable => StatusCode::BAD_GATEWAY,
            Error::DatabaseUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::FailedDatabaseCall(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedToSerializeToBson(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse<BoxBody> {
        #[derive(Serialize)]
        struct Dummy<'a> {
            error: String,
            error_code: &'static str,
            error_meta: &'a Error,
        }

        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error_code = self.error_code(), "{}", self);
        } else {
            tracing::warn!(error_code = self.error_code(), "{}", self);
        }

        HttpResponse::build(status).json(&Dummy {
            error: self.error_message(),
            error_code: self.error_code(),
            error_meta: self,
        })
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        Debug::fmt(self, f)
    }
}

impl From<DatabaseError> for Error {
    fn from(error: DatabaseError) -> Error {
        match error.kind.as_ref() {
            DatabaseErrorKind::ServerSelection { .. }
            | DatabaseErrorKind::Io(_)
            | DatabaseErrorKind::ConnectionPoolCleared { .. } => Error::DatabaseUnavailable(error),
            _ => Error::FailedDatabaseCall(error),
        }
    }
}

impl From<BsonError> for Error {
    fn from(error: BsonError) -> Error {
        Error::FailedToSerializeToBson(error)
    }
}

impl From<IoError> for Error {
    fn from(error: IoError) -> Error {
        Error::IoError(error)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidJson(err) => Some(err),
            Error::DatabaseUnavailable(err) => Some(err),
            Error::FailedDatabaseCall(err) => Some(err),
            Error::FailedToSerializeToBson(err) => Some(err),
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

fn display<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Display,
    S: Serializer,
{
    serializer.collect_str(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_json(error: &Error) -> serde_json::Value {
        let bytes = to_bytes(error.error_response().into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn status_codes_follow_error_kind() {
        let campaign_id = CampaignId::new();

        assert_eq!(
            Error::InvalidDate {
                field: "start_date",
                value: "yesterday".into()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::CampaignNotFound { campaign_id }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::ConcurrentModificationDetected.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            Error::MissingField { field: "name" }.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            Error::CampaignNotPublished { campaign_id }.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            Error::GatewayUnavailable.status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            Error::GatewayNotConfigured { missing: vec![] }.status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[actix_web::test]
    async fn response_carries_error_message() {
        let body = body_json(&Error::MissingField { field: "ad_headline" }).await;

        assert_eq!(body["error"], "Missing field: ad_headline");
        assert_eq!(body["error_code"], "E4221000");
        assert_eq!(body["error_meta"]["field"], "ad_headline");
    }

    #[actix_web::test]
    async fn oversized_budget_names_the_limit() {
        let body = body_json(&Error::DailyBudgetTooLarge {
            daily_budget: 10_000_000_000_000,
            max: 9_223_372_036_854,
        })
        .await;

        assert_eq!(body["error"], "daily_budget must not exceed 9223372036854");
        assert_eq!(body["error_code"], "E4221004");
        assert_eq!(body["error_meta"]["max"], 9_223_372_036_854_i64);
    }

    #[actix_web::test]
    async fn rejected_request_message_is_platform_detail() {
        let body = body_json(&Error::GatewayRejectedRequest {
            details: "DUPLICATE_CAMPAIGN_NAME: name taken | REQUIRED: missing".into(),
        })
        .await;

        assert_eq!(
            body["error"],
            "DUPLICATE_CAMPAIGN_NAME: name taken | REQUIRED: missing"
        );
    }
}
