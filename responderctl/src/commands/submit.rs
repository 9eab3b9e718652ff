//! Sending status updates
use anyhow::Result;
use inquire::{
    Text,
    validator::{MaxLengthValidator, ValueRequiredValidator},
};
use libresponder::{
    backend::HttpBackend,
    submit::{
        MESSAGE_MAX_CHARS, MessageSubmitter, NAME_IN_NEED_MAX_CHARS, SERVICE_PROVIDED_MAX_CHARS,
    },
};
use std::sync::Arc;

use crate::config::Config;

fn prompt_field(value: Option<String>, message: &str, max: usize) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Text::new(message)
            .with_validator(ValueRequiredValidator::default())
            .with_validator(MaxLengthValidator::new(max))
            .prompt()?),
    }
}

/// Handle the `responderctl submit` command. Missing fields are prompted for.
pub(crate) async fn handle_command(
    cfg: &Config,
    service: Option<String>,
    name: Option<String>,
    message: Option<String>,
) -> Result<()> {
    let name = prompt_field(name, "Name of the person in need:", NAME_IN_NEED_MAX_CHARS)?;
    let service = prompt_field(service, "Service provided:", SERVICE_PROVIDED_MAX_CHARS)?;
    let message = match message {
        Some(m) => m,
        None => inquire::Editor::new("Message (include time and date):")
            .with_validator(ValueRequiredValidator::default())
            .with_validator(MaxLengthValidator::new(MESSAGE_MAX_CHARS))
            .prompt()?
            .trim_end()
            .to_string(),
    };
    let submitter = MessageSubmitter::new(Arc::new(HttpBackend::new(&cfg.server, cfg.timeout())?));
    submitter.submit(&service, &name, &message).await?;
    println!("Update sent");
    Ok(())
}
