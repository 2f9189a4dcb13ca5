use std::collections::HashMap;

use super::print_form_errors;
use crate::config::Config;
use crate::state::SharedState;

pub async fn cmd_password_reset(config: &Config, email: String) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let factory = state
        .request_password_form_factory()
        .on_success(|email| println!("✓ Password reset requested for {email}"));

    let mut form = factory.create();
    form.fill(&HashMap::from([("email".to_string(), email)]));

    if !factory.submit(&mut form).await? {
        print_form_errors(&form);
    }

    Ok(())
}
