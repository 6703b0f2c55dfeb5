use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

use crate::config::Config;

pub type Db = Pool<Postgres>;

pub async fn connect(config: &Config) -> Result<Db> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    Ok(pool)
}

pub async fn migrate(db: &Db) -> Result<()> {
    // crate-relative path for sqlx migrations
    sqlx::migrate!("./migrations").run(db).await?;
    Ok(())
}
