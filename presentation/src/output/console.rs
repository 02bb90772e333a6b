//! Console output formatter for SDK replies

use ausweis_application::CommandError;
use ausweis_domain::{
    AccessRight, AccessRights, ApiLevel, Auth, Certificate, ChangePin, Info, Pause, ReaderData,
    ReaderList, Status,
};
use colored::Colorize;
use serde::Serialize;

/// Formats SDK replies for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    pub fn format_info(info: &Info) -> String {
        let version = &info.version_info;
        let mut output = Self::header("AusweisApp SDK");
        output.push('\n');
        output.push_str(&Self::field("Name", &version.name));
        output.push_str(&Self::field("Version", &version.implementation_version));
        output.push_str(&Self::field("Vendor", &version.implementation_vendor));
        output.push_str(&Self::field(
            "Specification",
            &format!(
                "{} {}",
                version.specification_title, version.specification_version
            ),
        ));
        if let Some(state) = info.ausweis_app {
            output.push_str(&Self::field("AusweisApp", &format!("{:?}", state)));
        }
        output
    }

    pub fn format_status(status: &Status) -> String {
        let Some(workflow) = status.workflow else {
            return format!("{}\n", "No workflow running".dimmed());
        };

        let mut output = Self::field("Workflow", &format!("{:?}", workflow));
        if let Some(progress) = status.progress {
            output.push_str(&Self::field("Progress", &format!("{}%", progress)));
        }
        if let Some(state) = status.state {
            output.push_str(&Self::field("State", state.as_str()));
        }
        output
    }

    pub fn format_api_level(level: &ApiLevel) -> String {
        let current = level
            .current
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let available = level
            .available
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        let mut output = Self::field("Current", &current);
        output.push_str(&Self::field("Available", &available));
        output
    }

    pub fn format_readers(list: &ReaderList) -> String {
        if list.readers.is_empty() {
            return format!("{}\n", "No card readers connected".yellow());
        }

        let mut output = String::new();
        for reader in &list.readers {
            output.push_str(&format!(
                "  {} {}\n",
                reader.name.bold(),
                Self::card_state(reader)
            ));
        }
        output
    }

    pub fn format_access_rights(rights: &AccessRights) -> String {
        let mut output = Self::section_header("Requested access rights");
        output.push_str(&Self::rights_line("Required", &rights.chat.required));
        output.push_str(&Self::rights_line("Optional", &rights.chat.optional));
        output.push_str(&Self::rights_line("Effective", &rights.chat.effective));

        if let Some(aux) = &rights.aux {
            if let Some(age) = &aux.required_age {
                output.push_str(&Self::field("Required age", age));
            }
            if let Some(community) = &aux.community_id {
                output.push_str(&Self::field("Community ID", community));
            }
        }
        if let Some(info) = &rights.transaction_info {
            output.push_str(&Self::field("Transaction", info));
        }
        output
    }

    pub fn format_certificate(certificate: &Certificate) -> String {
        let description = &certificate.description;
        let mut output = Self::section_header("Service provider");
        output.push_str(&Self::field("Subject", &description.subject_name));
        output.push_str(&Self::field("URL", &description.subject_url));
        output.push_str(&Self::field("Issuer", &description.issuer_name));
        output.push_str(&Self::field("Purpose", &description.purpose));
        output.push_str(&Self::field(
            "Valid",
            &format!(
                "{} to {}",
                certificate.validity.effective_date, certificate.validity.expiration_date
            ),
        ));
        output
    }

    pub fn format_auth(auth: &Auth) -> String {
        let failed = auth.error.is_some() || auth.result.as_ref().is_some_and(|r| r.is_error());
        let mut output = if failed {
            format!("{}\n", "Authentication failed".red().bold())
        } else {
            format!("{}\n", "Authentication succeeded".green().bold())
        };

        if let Some(error) = &auth.error {
            output.push_str(&Self::field("Error", error));
        }
        if let Some(result) = &auth.result {
            if let Some(reason) = &result.reason {
                output.push_str(&Self::field("Reason", reason.as_str()));
            }
            if let Some(message) = result.message.as_ref().or(result.description.as_ref()) {
                output.push_str(&Self::field("Message", message));
            }
        }
        if let Some(url) = &auth.url {
            output.push_str(&Self::field("Redirect", url));
        }
        output
    }

    pub fn format_change_pin(change: &ChangePin) -> String {
        if change.success == Some(true) {
            return format!("{}\n", "PIN changed".green().bold());
        }

        let mut output = format!("{}\n", "PIN change failed".red().bold());
        if let Some(reason) = &change.reason {
            output.push_str(&Self::field("Reason", reason.as_str()));
        }
        output
    }

    pub fn format_pause(pause: &Pause) -> String {
        format!(
            "{} {} (continuing)\n",
            "Workflow paused:".yellow().bold(),
            pause.cause
        )
    }

    pub fn format_error(error: &CommandError) -> String {
        let mut output = format!("{} {}\n", "Error:".red().bold(), error);
        if let Some(code) = error.failure_code() {
            output.push_str(&Self::field("Failure code", code.as_str()));
        }
        output
    }

    /// Format any reply payload as pretty JSON
    pub fn format_json<T: Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }

    fn card_state(reader: &ReaderData) -> String {
        if !reader.attached {
            return "(detached)".dimmed().to_string();
        }
        match &reader.card {
            None => "(no card)".dimmed().to_string(),
            Some(card) if card.deactivated == Some(true) => "(card deactivated)".red().to_string(),
            Some(card) => match card.retry_counter {
                Some(retries) => format!("(card, {} PIN attempts left)", retries)
                    .green()
                    .to_string(),
                None => "(card)".green().to_string(),
            },
        }
    }

    fn rights_line(label: &str, rights: &[AccessRight]) -> String {
        if rights.is_empty() {
            return String::new();
        }
        let names = rights
            .iter()
            .map(|r| format!("{:?}", r))
            .collect::<Vec<_>>()
            .join(", ");
        Self::field(label, &names)
    }

    fn field(label: &str, value: &str) -> String {
        format!("  {} {}\n", format!("{}:", label).cyan(), value)
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(40);
        format!("{}\n{:^40}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("{}\n", title.cyan().bold())
    }
}
