use anyhow::Result;

use crate::core::AppConfig;
use crate::gateway::{ConversationApi, Gateway};

pub async fn run(config: &AppConfig) -> Result<()> {
    let gateway = Gateway::new(&config.api_url);
    let status = gateway.status().await?;
    let db = status.database;

    println!("Server: {}", gateway.api_base_url());
    if !db.exists {
        println!("Database: not initialized");
        return Ok(());
    }
    println!("Groups:   {}", db.groups_count.unwrap_or_default());
    println!("Players:  {}", db.players_count.unwrap_or_default());
    println!("Messages: {}", db.messages_count.unwrap_or_default());
    Ok(())
}
