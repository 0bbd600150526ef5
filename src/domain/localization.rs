//! User-facing strings emitted by the renderer.
//!
//! The strings end up inside rendered HTML (phishing warnings, placeholder text)
//! or are returned to callers from account-name validation, so every one of them
//! must be present. They are checked once when a renderer is built and never
//! change afterwards.

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizationStrings {
    pub phishing_warning: String,
    pub external_link: String,
    pub no_image: String,
    pub account_name_wrong_length: String,
    pub account_name_bad_actor: String,
    pub account_name_wrong_segment: String,
}

impl Default for LocalizationStrings {
    fn default() -> Self {
        Self {
            phishing_warning:
                "Link expanded to plain text; beware of a potential phishing attempt".to_string(),
            external_link: "This link will take you away from this site".to_string(),
            no_image: "Images not allowed".to_string(),
            account_name_wrong_length: "Account name should be between 3 and 16 characters long"
                .to_string(),
            account_name_bad_actor: "This account is on a bad actor list".to_string(),
            account_name_wrong_segment: "This account name contains a bad segment".to_string(),
        }
    }
}

impl LocalizationStrings {
    /// Reject the first empty (or whitespace-only) string.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields: [(&'static str, &str); 6] = [
            ("localization.phishing_warning", &self.phishing_warning),
            ("localization.external_link", &self.external_link),
            ("localization.no_image", &self.no_image),
            (
                "localization.account_name_wrong_length",
                &self.account_name_wrong_length,
            ),
            (
                "localization.account_name_bad_actor",
                &self.account_name_bad_actor,
            ),
            (
                "localization.account_name_wrong_segment",
                &self.account_name_wrong_segment,
            ),
        ];

        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(ValidationError::empty(field)),
            None => Ok(()),
        }
    }
}
