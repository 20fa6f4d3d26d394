use adsync::config::Settings;
use adsync::error::Error;

#[actix_web::main]
async fn main() -> Result<(), Error> {
    adsync::run(Settings::from_env()).await
}
