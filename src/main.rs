use anyhow::Result;
use nexus::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
