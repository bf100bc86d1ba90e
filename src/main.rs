use waypoint::config::Config;
use waypoint::engine::Engine;
use waypoint::error::Error;
use waypoint::server::serve;

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let engine = Engine::from_config(&config)?;

    serve(engine, config.listen_addr).await
}
