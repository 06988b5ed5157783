// src/main.rs

use mediaforge::{cli, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::parse();

    logging::init_logging(args.log_level)?;

    mediaforge::run(args).await
}
