//! Contact filter options.

use once_cell::sync::Lazy;
use regex::Regex;

static NON_DIGIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9]+").expect("valid digit regex"));

/// Filter and pagination options for contact enumeration.
///
/// All filters are combined with AND. Blank filters are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactQuery {
    /// Case-insensitive substring of any name part.
    pub text: Option<String>,
    /// Phone number; only its digits are compared.
    pub phone: Option<String>,
    /// Case-insensitive substring of any email address.
    pub email: Option<String>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl ContactQuery {
    pub fn text_needle(&self) -> Option<String> {
        lowercase_needle(self.text.as_deref())
    }

    pub fn email_needle(&self) -> Option<String> {
        lowercase_needle(self.email.as_deref())
    }

    pub fn phone_digits(&self) -> Option<String> {
        self.phone
            .as_deref()
            .map(normalize_phone_digits)
            .filter(|digits| !digits.is_empty())
    }
}

/// Strips everything except ASCII digits.
pub fn normalize_phone_digits(value: &str) -> String {
    NON_DIGIT_RE.replace_all(value, "").into_owned()
}

/// Case folding shared by query needles and stored values.
pub fn fold_case(value: &str) -> String {
    value.to_lowercase()
}

fn lowercase_needle(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(fold_case)
}

#[cfg(test)]
mod tests {
    use super::{normalize_phone_digits, ContactQuery};

    #[test]
    fn phone_digits_ignore_punctuation() {
        assert_eq!(normalize_phone_digits("+1 (555) 010-9999"), "15550109999");
    }

    #[test]
    fn blank_filters_are_ignored() {
        let query = ContactQuery {
            text: Some("   ".to_string()),
            phone: Some("--".to_string()),
            email: Some("".to_string()),
            ..ContactQuery::default()
        };
        assert_eq!(query.text_needle(), None);
        assert_eq!(query.phone_digits(), None);
        assert_eq!(query.email_needle(), None);
    }
}
