use anyhow::{Result, anyhow};

use super::connect;
use crate::core::AppConfig;
use crate::gateway::GroupId;
use crate::session::Refresh;

pub async fn list(config: &AppConfig) -> Result<()> {
    let session = connect(config);
    if session.refresh_groups().await == Refresh::Failed {
        return Err(anyhow!("Could not fetch groups from {}", config.api_url));
    }

    let groups = session.snapshot().groups;
    if groups.is_empty() {
        println!("No groups yet, create one with `create-group`");
    }
    for group in groups {
        println!(
            "{:>4}  {} ({} messages)",
            group.id, group.name, group.message_count
        );
        if !group.description.is_empty() {
            println!("      {}", group.description);
        }
    }
    Ok(())
}

pub async fn create(config: &AppConfig, name: &str, description: &str) -> Result<()> {
    let session = connect(config);
    let group_id = session.create_group(name, description).await?;
    println!("Created group {} ({})", name.trim(), group_id);
    Ok(())
}

pub async fn delete(config: &AppConfig, group_id: GroupId) -> Result<()> {
    let session = connect(config);
    session.delete_group(group_id).await?;
    println!("Deleted group {}", group_id);
    Ok(())
}
