mod cli;

use crate::cli::app::App;
use dragonball_admin::{Console, ConsoleConfig, HttpGateway, logging};
use std::error::Error;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = ConsoleConfig::from_env()?;
    logging::init_file(&config.data_dir.join("console.log"))?;

    let gateway = Arc::new(HttpGateway::new(&config)?);
    let console = Console::open(config)?;

    let mut app = App::new(console, gateway);
    app.run().await?;
    Ok(())
}
