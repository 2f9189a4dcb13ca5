use std::path::Path;

use crate::config::Config;
use crate::domain::UserId;
use crate::state::SharedState;

pub async fn cmd_gdpr_download(
    config: &Config,
    user_id: i32,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;

    if state.store.get_user(user_id).await?.is_none() {
        println!("User with ID {user_id} not found.");
        return Ok(());
    }

    let user_id = UserId::new(user_id);
    let export = state.user_data.download_all(user_id).await?;
    let json = serde_json::to_string_pretty(&export)?;

    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            println!("✓ Export written to {}", path.display());
        }
        None => println!("{json}"),
    }

    let attachments = state.user_data.attachments_all(user_id).await?;
    if !attachments.is_empty() {
        println!("Attachments:");
        for (provider, attachment) in attachments {
            println!("  • [{provider}] {} ({})", attachment.file_name, attachment.content_type);
        }
    }

    Ok(())
}

pub async fn cmd_gdpr_delete(config: &Config, user_id: i32, yes: bool) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;

    let Some(user) = state.store.get_user(user_id).await? else {
        println!("User with ID {user_id} not found.");
        return Ok(());
    };

    let blockers = state.user_data.deletion_blockers(UserId::new(user_id)).await?;
    if !blockers.is_empty() {
        println!("Personal data of {} cannot be erased:", user.email);
        for (provider, reason) in blockers {
            println!("  • {provider}: {}", reason.as_deref().unwrap_or("no reason given"));
        }
        return Ok(());
    }

    if !yes {
        println!(
            "Erase personal data of '{}' (ID: {}) from: {}?",
            user.email,
            user.id,
            state.user_data.identifiers().join(", ")
        );
        println!("Enter 'y' to confirm, anything else to cancel:");

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    state.user_data.delete_all(UserId::new(user_id)).await?;
    println!("✓ Personal data of {} erased", user.email);

    Ok(())
}
