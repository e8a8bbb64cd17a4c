//! Customer contact details collected on the first wizard step.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?1?[\s.-]?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}$").expect("phone pattern compiles")
});

static ZIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("zip pattern compiles"));

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[A-Za-z]{2,}$").expect("email pattern compiles")
});

const US_STATES: [&str; 51] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ", "NM",
    "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT", "VA", "WA",
    "WV", "WI", "WY",
];

/// One failed field check, shown inline next to the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub street: String,
    pub city: String,
    /// Two-letter US state code.
    pub state: String,
    pub zip: String,
}

impl Contact {
    /// Check every field; an empty vector means the contact step may advance.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "name is required"));
        }
        if !PHONE.is_match(self.phone.trim()) {
            errors.push(FieldError::new("phone", "enter a 10-digit phone number"));
        }
        if let Some(email) = self.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            if !EMAIL.is_match(email) {
                errors.push(FieldError::new("email", "enter a valid e-mail address"));
            }
        }
        if self.street.trim().is_empty() {
            errors.push(FieldError::new("street", "street address is required"));
        }
        if self.city.trim().is_empty() {
            errors.push(FieldError::new("city", "city is required"));
        }
        let state = self.state.trim().to_ascii_uppercase();
        if !US_STATES.contains(&state.as_str()) {
            errors.push(FieldError::new("state", "choose a US state"));
        }
        if !ZIP.is_match(self.zip.trim()) {
            errors.push(FieldError::new("zip", "enter a 5-digit ZIP code"));
        }

        errors
    }

    /// Digits of the phone number (`(555) 123-4567` → `5551234567`).
    pub fn phone_digits(&self) -> String {
        let digits: String = self.phone.chars().filter(char::is_ascii_digit).collect();
        match digits.len() {
            11 if digits.starts_with('1') => digits[1..].to_string(),
            _ => digits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Contact {
        Contact {
            name: "Dana Whitfield".to_string(),
            phone: "(555) 123-4567".to_string(),
            email: Some("dana@example.com".to_string()),
            street: "12 Elm St".to_string(),
            city: "Dayton".to_string(),
            state: "oh".to_string(),
            zip: "45402".to_string(),
        }
    }

    fn fields(errors: &[FieldError]) -> Vec<&'static str> {
        errors.iter().map(|e| e.field).collect()
    }

    #[test]
    fn valid_contact_has_no_errors() {
        assert!(valid().validate().is_empty());
    }

    #[test]
    fn phone_formats() {
        for phone in ["555-123-4567", "555.123.4567", "5551234567", "+1 555 123 4567"] {
            let c = Contact {
                phone: phone.to_string(),
                ..valid()
            };
            assert!(c.validate().is_empty(), "{phone} rejected");
        }
        let c = Contact {
            phone: "123-45".to_string(),
            ..valid()
        };
        assert_eq!(fields(&c.validate()), vec!["phone"]);
    }

    #[test]
    fn zip_plus_four_is_accepted() {
        let c = Contact {
            zip: "45402-1234".to_string(),
            ..valid()
        };
        assert!(c.validate().is_empty());
    }

    #[test]
    fn every_bad_field_is_reported() {
        let c = Contact {
            name: " ".to_string(),
            email: Some("nope".to_string()),
            state: "XX".to_string(),
            zip: "4540".to_string(),
            ..valid()
        };
        assert_eq!(fields(&c.validate()), vec!["name", "email", "state", "zip"]);
    }

    #[test]
    fn blank_email_is_optional() {
        let c = Contact {
            email: Some("  ".to_string()),
            ..valid()
        };
        assert!(c.validate().is_empty());
    }

    #[test]
    fn phone_digits_strips_country_code() {
        let c = Contact {
            phone: "+1 (555) 123-4567".to_string(),
            ..valid()
        };
        assert_eq!(c.phone_digits(), "5551234567");
    }
}
