use crate::config::Config;
use crate::db::Store;

pub async fn cmd_login_attempts(config: &Config, email: &str, limit: u64) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let attempts = store.list_login_attempts(email, limit).await?;

    if attempts.is_empty() {
        println!("No login attempts for {email}.");
        return Ok(());
    }

    let total = store.count_login_attempts(email).await?;
    println!("Login attempts for {email} ({} of {total}):", attempts.len());
    println!("{:-<70}", "");

    for attempt in attempts {
        println!(
            "• {} | {:<20} | {}",
            attempt.created_at, attempt.status, attempt.source
        );
        if let Some(message) = attempt.message {
            println!("  {message}");
        }
        if attempt.ip.is_some() || attempt.user_agent.is_some() {
            println!(
                "  {} | {}",
                attempt.ip.as_deref().unwrap_or("-"),
                attempt.user_agent.as_deref().unwrap_or("-")
            );
        }
    }

    Ok(())
}
