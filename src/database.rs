use mongodb::{bson, Client, Collection};

use crate::campaign::db::CampaignStore;
use crate::campaign::{self, Campaign};
use crate::error::Error;

pub type MongoCampaignStore = Collection<Campaign>;

pub trait Database: Send + Sync {
    fn campaigns(&self) -> &dyn CampaignStore;
}

#[derive(Debug, Clone)]
pub struct MongoDatabase {
    campaigns: Collection<Campaign>,
}

impl MongoDatabase {
    /// Connects, verifies the server answers, and makes sure indexes exist.
    #[tracing::instrument(skip(uri))]
    pub async fn connect(uri: &str, name: &str) -> Result<MongoDatabase, Error> {
        let db = Client::with_uri_str(uri).await?.database(name);

        // ping the database to ensure connection is established
        db.run_command(bson::doc! { "ping": 1 }, None).await?;

        MongoDatabase::initialize(db).await
    }

    pub async fn initialize(db: mongodb::Database) -> Result<MongoDatabase, Error> {
        campaign::db::initialize(&db).await?;

        Ok(MongoDatabase {
            campaigns: db.collection("campaigns"),
        })
    }
}

impl Database for MongoDatabase {
    fn campaigns(&self) -> &dyn CampaignStore {
        &self.campaigns
    }
}
