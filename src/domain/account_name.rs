//! Account-name rules used to decide whether an `@mention` is linked.
//!
//! A name is 3 to 16 characters long and made of dot-separated segments. Each
//! segment starts with a letter, ends with a letter or digit, holds only
//! lowercase letters, digits and single dashes, and is at least three
//! characters long. Names on the bad-actor list are refused outright.

use std::collections::BTreeSet;

use thiserror::Error;

use super::localization::LocalizationStrings;

const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 16;
const MIN_SEGMENT_LENGTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccountNameError {
    #[error("account name has the wrong length")]
    WrongLength,
    #[error("account name contains an invalid segment")]
    WrongSegment,
    #[error("account name is on the bad actor list")]
    BadActor,
}

impl AccountNameError {
    /// Localized message shown to users for this failure.
    pub fn message<'a>(&self, strings: &'a LocalizationStrings) -> &'a str {
        match self {
            AccountNameError::WrongLength => &strings.account_name_wrong_length,
            AccountNameError::WrongSegment => &strings.account_name_wrong_segment,
            AccountNameError::BadActor => &strings.account_name_bad_actor,
        }
    }
}

/// Validates account names against the structural rules and a bad-actor list.
#[derive(Debug, Clone, Default)]
pub struct AccountNameValidator {
    bad_actors: BTreeSet<String>,
}

impl AccountNameValidator {
    pub fn new<I, S>(bad_actors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            bad_actors: bad_actors
                .into_iter()
                .map(|name| name.as_ref().trim().to_ascii_lowercase())
                .filter(|name| !name.is_empty())
                .collect(),
        }
    }

    pub fn validate(&self, name: &str) -> Result<(), AccountNameError> {
        let length = name.chars().count();
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&length) {
            return Err(AccountNameError::WrongLength);
        }

        if !name.split('.').all(is_valid_segment) {
            return Err(AccountNameError::WrongSegment);
        }

        if self.bad_actors.contains(name) {
            return Err(AccountNameError::BadActor);
        }

        Ok(())
    }

    pub fn is_valid(&self, name: &str) -> bool {
        self.validate(name).is_ok()
    }
}

fn is_valid_segment(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };

    first.is_ascii_lowercase()
        && (last.is_ascii_lowercase() || last.is_ascii_digit())
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        && !segment.contains("--")
        && segment.len() >= MIN_SEGMENT_LENGTH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_regular_names() {
        let validator = AccountNameValidator::default();
        assert!(validator.is_valid("noisy"));
        assert!(validator.is_valid("good-karma"));
        assert!(validator.is_valid("abc.def"));
        assert!(validator.is_valid("user123"));
    }

    #[test]
    fn rejects_length_violations() {
        let validator = AccountNameValidator::default();
        assert_eq!(validator.validate("ab"), Err(AccountNameError::WrongLength));
        assert_eq!(
            validator.validate("toolongusername1234"),
            Err(AccountNameError::WrongLength)
        );
    }

    #[test]
    fn rejects_bad_segments() {
        let validator = AccountNameValidator::default();
        for name in ["1abc", "abc-", "ab--cd", "abc.de", "ABCD", "abc_d"] {
            assert_eq!(
                validator.validate(name),
                Err(AccountNameError::WrongSegment),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_bad_actors_case_insensitively() {
        let validator = AccountNameValidator::new(["Scammer"]);
        assert_eq!(
            validator.validate("scammer"),
            Err(AccountNameError::BadActor)
        );
    }

    #[test]
    fn maps_errors_to_localized_messages() {
        let strings = LocalizationStrings::default();
        assert_eq!(
            AccountNameError::WrongLength.message(&strings),
            strings.account_name_wrong_length
        );
        assert_eq!(
            AccountNameError::BadActor.message(&strings),
            strings.account_name_bad_actor
        );
    }
}
