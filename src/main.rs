use std::sync::Arc;

use course_progress::{
    app,
    certificate::RandomCodes,
    config::Config,
    db,
    store::PgStore,
    Engine,
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = db::connect(&config).await?;
    db::migrate(&pool).await?;

    let engine = Engine::with_codes(
        Arc::new(PgStore::new(pool)),
        Arc::new(RandomCodes::new(config.cert_code_prefix.clone())),
    );

    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{}", addr);

    axum::serve(listener, app(engine)).await?;
    Ok(())
}
