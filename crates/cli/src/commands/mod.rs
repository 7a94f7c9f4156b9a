pub mod migrate;
pub mod seed;
pub mod vendor;

use sqlx::PgPool;

use dishdash_server::config::database_url_from_env;
use dishdash_server::db::create_pool;

/// Connect using `DISHDASH_DATABASE_URL` (or `DATABASE_URL`).
pub async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    let database_url = database_url_from_env()?;
    tracing::info!("Connecting to database...");
    Ok(create_pool(&database_url).await?)
}
