use std::collections::HashMap;

use super::print_form_errors;
use crate::cli::ProfileArgs;
use crate::config::Config;
use crate::forms::UserFormOutcome;
use crate::state::SharedState;

fn flag(value: bool) -> String {
    if value { "1" } else { "" }.to_string()
}

fn apply_profile(values: &mut HashMap<String, String>, profile: ProfileArgs) {
    let text = [
        ("first_name", profile.first_name),
        ("last_name", profile.last_name),
        ("role", profile.role),
        ("institution_name", profile.institution_name),
        ("ext_id", profile.ext_id),
    ];
    for (name, value) in text {
        if let Some(value) = value {
            values.insert(name.to_string(), value);
        }
    }

    if let Some(active) = profile.active {
        values.insert("active".to_string(), flag(active));
    }
    if let Some(is_institution) = profile.is_institution {
        values.insert("is_institution".to_string(), flag(is_institution));
    }
}

pub async fn cmd_user_create(
    config: &Config,
    email: String,
    password: String,
    profile: ProfileArgs,
) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let factory = state.user_form_factory();
    let mut form = factory.create(None).await?;

    let mut values = HashMap::from([
        ("email".to_string(), email),
        ("password".to_string(), password),
        ("active".to_string(), flag(true)),
    ]);
    apply_profile(&mut values, profile);
    form.fill(&values);

    match factory.submit(&mut form).await? {
        Some(UserFormOutcome::Created(user)) => {
            println!("✓ Created user {} (ID: {})", user.email, user.id);
        }
        Some(UserFormOutcome::Updated(user)) => {
            println!("✓ Updated user {} (ID: {})", user.email, user.id);
        }
        None => print_form_errors(&form),
    }

    Ok(())
}

pub async fn cmd_user_update(
    config: &Config,
    id: i32,
    email: Option<String>,
    password: Option<String>,
    profile: ProfileArgs,
) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let factory = state.user_form_factory();

    if state.store.get_user(id).await?.is_none() {
        println!("User with ID {id} not found.");
        return Ok(());
    }

    let mut form = factory.create(Some(id)).await?;

    let mut values = form.values();
    if let Some(email) = email {
        values.insert("email".to_string(), email);
    }
    if let Some(password) = password {
        values.insert("password".to_string(), password);
    }
    apply_profile(&mut values, profile);
    form.fill(&values);

    match factory.submit(&mut form).await? {
        Some(outcome) => {
            let (UserFormOutcome::Created(user) | UserFormOutcome::Updated(user)) = outcome;
            println!("✓ Saved user {} (ID: {})", user.email, user.id);
        }
        None => print_form_errors(&form),
    }

    Ok(())
}
