use anyhow::Result;

use super::open_group;
use crate::core::AppConfig;
use crate::gateway::GroupId;
use crate::session::{RULE_TEMPLATES, RulesEditor};

pub async fn run(
    config: &AppConfig,
    group_id: GroupId,
    set: Option<String>,
    template: Option<String>,
    save: bool,
) -> Result<()> {
    let turn = open_group(config, group_id).await?;
    let session = turn.session();

    if let Some(key) = template {
        session.apply_rule_template(&key)?;
        if save {
            turn.save_rules().await?;
            println!("Rules replaced with template {}", key);
        } else if let RulesEditor::Open { buffer } = session.snapshot().rules_editor {
            println!("{}", buffer.trim());
            println!("\nNot saved. Edit and pass it with --set, or rerun with --save");
        }
    } else if let Some(text) = set {
        turn.update_rules(&text).await?;
        println!("Rules updated");
    } else {
        let rules = session.snapshot().rules;
        if rules.trim().is_empty() {
            println!("This group has no rules");
        } else {
            println!("{}", rules.trim());
        }
    }
    Ok(())
}

pub fn list_templates() {
    for template in RULE_TEMPLATES {
        println!("{:<22} {}: {}", template.key, template.name, template.description);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use mockito::Matcher;
    use serde_json::json;
    use tempfile::tempdir;

    use crate::cli::testing::{serve_debate_club, test_config};
    use crate::session::find_template;

    #[tokio::test]
    async fn it_only_prints_a_template_without_save() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let _served = serve_debate_club(&mut server).await;
        let put = server
            .mock("PUT", "/groups/1/rules")
            .expect(0)
            .create_async()
            .await;
        let dir = tempdir()?;

        run(
            &test_config(&server, dir.path()),
            1,
            None,
            Some("debate_style".to_string()),
            false,
        )
        .await?;

        put.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn it_saves_a_template_when_asked() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let _served = serve_debate_club(&mut server).await;
        let template = find_template("debate_style").expect("Missing template");
        let put = server
            .mock("PUT", "/groups/1/rules")
            .match_body(Matcher::Json(json!({"rules": template.rules})))
            .with_body(r#"{"success": true}"#)
            .expect(1)
            .create_async()
            .await;
        let dir = tempdir()?;

        run(
            &test_config(&server, dir.path()),
            1,
            None,
            Some("debate_style".to_string()),
            true,
        )
        .await?;

        put.assert_async().await;
        Ok(())
    }
}
