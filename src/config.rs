use chrono::Duration;

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";
const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017";
const DEFAULT_MONGODB_DATABASE: &str = "adsync";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_GOOGLE_ADS_API_URL: &str = "https://googleads.googleapis.com/v17";
const DEFAULT_GOOGLE_ADS_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_PUBLISH_CLAIM_TIMEOUT_SECS: u32 = 900;

#[derive(Clone, Debug)]
pub struct Settings {
    pub bind_address: String,
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub log_level: String,
    pub publish: PublishSettings,
    pub google_ads: GoogleAdsSettings,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PublishSettings {
    /// How long a pending-publish marker blocks other publishes. Past this,
    /// the claim is considered abandoned and may be taken over.
    pub claim_timeout: Duration,
}

impl Default for PublishSettings {
    fn default() -> PublishSettings {
        PublishSettings {
            claim_timeout: Duration::seconds(i64::from(DEFAULT_PUBLISH_CLAIM_TIMEOUT_SECS)),
        }
    }
}

/// Credentials are kept optional here; the gateway decides whether the set is
/// complete enough to talk to the platform.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct GoogleAdsSettings {
    pub developer_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub login_customer_id: Option<String>,
    pub customer_id: Option<String>,
    pub api_url: String,
    pub token_url: String,
}

impl Settings {
    /// Reads `.env` if present, then the process environment.
    pub fn from_env() -> Settings {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("loaded environment from {}", path.display());
        }

        Settings::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Settings
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_owned());

        Settings {
            bind_address: get_or("BIND_ADDRESS", DEFAULT_BIND_ADDRESS),
            mongodb_uri: get_or("MONGODB_URI", DEFAULT_MONGODB_URI),
            mongodb_database: get_or("MONGODB_DATABASE", DEFAULT_MONGODB_DATABASE),
            log_level: get_or("LOG_LEVEL", DEFAULT_LOG_LEVEL).to_lowercase(),
            publish: PublishSettings {
                claim_timeout: Duration::seconds(i64::from(
                    get("PUBLISH_CLAIM_TIMEOUT_SECS")
                        .and_then(|value| match value.trim().parse::<u32>() {
                            Ok(secs) => Some(secs),
                            Err(_) => {
                                tracing::warn!(
                                    %value,
                                    "ignoring invalid PUBLISH_CLAIM_TIMEOUT_SECS"
                                );
                                None
                            }
                        })
                        .unwrap_or(DEFAULT_PUBLISH_CLAIM_TIMEOUT_SECS),
                )),
            },
            google_ads: GoogleAdsSettings {
                developer_token: get("GOOGLE_ADS_DEVELOPER_TOKEN"),
                client_id: get("GOOGLE_ADS_CLIENT_ID"),
                client_secret: get("GOOGLE_ADS_CLIENT_SECRET"),
                refresh_token: get("GOOGLE_ADS_REFRESH_TOKEN"),
                login_customer_id: get("GOOGLE_ADS_LOGIN_CUSTOMER_ID"),
                customer_id: get("GOOGLE_ADS_CUSTOMER_ID"),
                api_url: get_or("GOOGLE_ADS_API_URL", DEFAULT_GOOGLE_ADS_API_URL),
                token_url: get_or("GOOGLE_ADS_TOKEN_URL", DEFAULT_GOOGLE_ADS_TOKEN_URL),
            },
        }
    }
}

impl GoogleAdsSettings {
    /// Names of the credentials that are not set, in a stable order.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let credentials = [
            ("GOOGLE_ADS_DEVELOPER_TOKEN", &self.developer_token),
            ("GOOGLE_ADS_CLIENT_ID", &self.client_id),
            ("GOOGLE_ADS_CLIENT_SECRET", &self.client_secret),
            ("GOOGLE_ADS_REFRESH_TOKEN", &self.refresh_token),
            ("GOOGLE_ADS_LOGIN_CUSTOMER_ID", &self.login_customer_id),
            ("GOOGLE_ADS_CUSTOMER_ID", &self.customer_id),
        ];

        credentials
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect()
    }
}

// secrets stay out of logs
impl std::fmt::Debug for GoogleAdsSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleAdsSettings")
            .field("customer_id", &self.customer_id)
            .field("login_customer_id", &self.login_customer_id)
            .field("missing", &self.missing_credentials())
            .field("api_url", &self.api_url)
            .field("token_url", &self.token_url)
            .finish()
    }
}
