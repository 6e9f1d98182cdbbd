//! Notifier payloads: share-link messages and email drafts.
//!
//! Delivery is left to the host; this module only builds what gets sent.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::conf::C_WHATSAPP_SEND_URL;
use crate::spec::{NotifyError, SpecEmailOptions};

/// Something that turns a target and a message into a delivery artifact.
pub trait Notifier {
    /// Returns a delivery reference (link, message id, ...).
    fn notify(&self, target: &str, body: &str) -> Result<String, NotifyError>;
}

/// Notifier that answers with a prefilled WhatsApp Web link.
///
/// The target (group or contact name) is only checked for presence; the user
/// picks the chat after opening the link.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkNotifier;

impl Notifier for LinkNotifier {
    fn notify(&self, target: &str, body: &str) -> Result<String, NotifyError> {
        if target.trim().is_empty() {
            return Err(NotifyError::EmptyTarget);
        }
        derive_whatsapp_link(body)
    }
}

/// Handover message for one partition file.
pub fn derive_whatsapp_message(partition_name: &str, file_name: &str) -> String {
    format!(
        "Serah Terima IM - {partition_name}\n\nFile: {file_name}\n\nMohon di-download dan di-check. Terima kasih!"
    )
}

/// `https://web.whatsapp.com/send?text=<form-encoded message>`.
pub fn derive_whatsapp_link(message: &str) -> Result<String, NotifyError> {
    if message.trim().is_empty() {
        return Err(NotifyError::EmptyMessage);
    }
    let url = Url::parse_with_params(C_WHATSAPP_SEND_URL, &[("text", message)])
        .map_err(|e| NotifyError::Link(e.to_string()))?;
    Ok(url.into())
}

/// One generated document offered for mailing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecMailEntry {
    /// Recipient; entries without `@` are not mailed.
    pub email: String,
    /// Greeting name.
    pub name: String,
    /// Document id shown in the subject.
    pub document_id: String,
    pub file_name: String,
}

/// One email to compose: recipient, wording and attachments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecEmailDraft {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub files: Vec<String>,
}

/// Group entries by recipient (first-occurrence order) into drafts.
pub fn plan_email_drafts(
    entries: &[SpecMailEntry],
    spec_options: &SpecEmailOptions,
) -> Vec<SpecEmailDraft> {
    let mut l_groups: Vec<(String, Vec<&SpecMailEntry>)> = Vec::new();
    for entry in entries {
        let c_email = entry.email.trim();
        if c_email.is_empty() || !c_email.contains('@') {
            continue;
        }
        match l_groups.iter_mut().find(|(c_to, _)| c_to == c_email) {
            Some((_, l_entries)) => l_entries.push(entry),
            None => l_groups.push((c_email.to_string(), vec![entry])),
        }
    }

    l_groups
        .into_iter()
        .map(|(c_to, l_entries)| {
            let l_ids: Vec<&str> = l_entries
                .iter()
                .take(spec_options.n_subject_ids_max)
                .map(|entry| entry.document_id.as_str())
                .collect();
            let c_ellipsis = if l_entries.len() > spec_options.n_subject_ids_max {
                "..."
            } else {
                ""
            };
            let subject = format!("{}{}{c_ellipsis}", spec_options.subject_prefix, l_ids.join(", "));

            let c_listing = l_entries
                .iter()
                .map(|entry| format!("- {}", entry.file_name))
                .collect::<Vec<_>>()
                .join("\n");
            let body = format!(
                "Dear {},\n\nPlease find attached your PV document(s):\n\n{c_listing}\n\nBest regards,\n{}",
                l_entries[0].name, spec_options.signoff
            );

            SpecEmailDraft {
                to: c_to,
                subject,
                body,
                files: l_entries.iter().map(|entry| entry.file_name.clone()).collect(),
            }
        })
        .collect()
}
