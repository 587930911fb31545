use gateway_server::config::{self, ServerConfig};
use gateway_server::observability::init_observability;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init();
    init_observability();
    let config = ServerConfig::from_env();
    gateway_server::serve(config).await
}
