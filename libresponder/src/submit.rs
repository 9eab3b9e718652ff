//! Status reports sent by responders to the messaging backend
use crate::{
    backend::MessagingApi,
    error::{Error, Result},
};
use std::sync::Arc;
use tracing::{debug, error};

pub const SERVICE_PROVIDED_MAX_CHARS: usize = 10;
pub const NAME_IN_NEED_MAX_CHARS: usize = 30;
pub const MESSAGE_MAX_CHARS: usize = 100;

/// Shown when a report is missing one of its fields
pub const MISSING_FIELDS: &str = "Fill up the requirements";
/// Shown when a valid report couldn't be delivered
pub const SUBMISSION_FAILED: &str = "Failed to send the update, please try again";

/// A validated report, ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    service_provided: String,
    name_in_need: String,
    message: String,
}

impl StatusReport {
    /// Validate the three fields of a report. All of them must contain something other than
    /// whitespace and fit their length limits.
    pub fn new(service_provided: &str, name_in_need: &str, message: &str) -> Result<Self> {
        if [service_provided, name_in_need, message]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(Error::Validation(MISSING_FIELDS.to_string()));
        }
        check_length("service provided", service_provided, SERVICE_PROVIDED_MAX_CHARS)?;
        check_length("name of the person in need", name_in_need, NAME_IN_NEED_MAX_CHARS)?;
        check_length("message", message, MESSAGE_MAX_CHARS)?;
        Ok(Self {
            service_provided: service_provided.to_string(),
            name_in_need: name_in_need.to_string(),
            message: message.to_string(),
        })
    }

    /// The single message string the backend stores for this report
    pub fn compose(&self) -> String {
        format!(
            "The Service Provided is {}. The name of the person in need is {}. {}",
            self.service_provided, self.name_in_need, self.message
        )
    }
}

fn check_length(field: &'static str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(Error::FieldTooLong { field, max });
    }
    Ok(())
}

/// Sends [StatusReport]s. Failures are not retried.
#[derive(Clone)]
pub struct MessageSubmitter {
    api: Arc<dyn MessagingApi>,
}

impl MessageSubmitter {
    pub fn new(api: Arc<dyn MessagingApi>) -> Self {
        Self { api }
    }

    /// Validate and send a report. Invalid input never reaches the network. Delivery failures
    /// are reported as [Error::Submission].
    pub async fn submit(
        &self,
        service_provided: &str,
        name_in_need: &str,
        message: &str,
    ) -> Result<()> {
        let report = StatusReport::new(service_provided, name_in_need, message)?;
        self.send(&report).await
    }

    pub async fn send(&self, report: &StatusReport) -> Result<()> {
        let message = report.compose();
        debug!(%message, "submitting report");
        self.api.submit_message(&message).await.map_err(|e| {
            error!(error = %e, "Error sending message");
            Error::Submission(Box::new(e))
        })
    }
}

/// The report input form. Input is clipped to the field limits as it is typed, and the form
/// closes itself once a report has been delivered.
#[derive(Debug, Clone, Default)]
pub struct ReportForm {
    service_provided: String,
    name_in_need: String,
    message: String,
    error: Option<String>,
    visible: bool,
}

impl ReportForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self) {
        self.visible = true;
    }

    pub fn close(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// The message to show below the inputs, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_service_provided(&mut self, value: &str) {
        self.service_provided = clip(value, SERVICE_PROVIDED_MAX_CHARS);
    }

    pub fn set_name_in_need(&mut self, value: &str) {
        self.name_in_need = clip(value, NAME_IN_NEED_MAX_CHARS);
    }

    pub fn set_message(&mut self, value: &str) {
        self.message = clip(value, MESSAGE_MAX_CHARS);
    }

    /// Submit the current input. On success the error is cleared and the form is dismissed.
    pub async fn send(&mut self, submitter: &MessageSubmitter) -> Result<()> {
        let result = submitter
            .submit(&self.service_provided, &self.name_in_need, &self.message)
            .await;
        match &result {
            Ok(()) => {
                self.error = None;
                self.visible = false;
            }
            Err(Error::Submission(_)) => self.error = Some(SUBMISSION_FAILED.to_string()),
            Err(e) => self.error = Some(e.to_string()),
        }
        result
    }
}

fn clip(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}
