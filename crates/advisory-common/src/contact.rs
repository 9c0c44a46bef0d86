use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::CommonError;

/// Contact details required before any report is rendered or persisted.
///
/// Absent fields deserialize as empty so they reach [`ContactInfo::validated`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ContactInfo {
    pub name: String,
    pub email: String,
    pub company: String,
    pub phone: String,
}

impl ContactInfo {
    /// Trim every field and reject the form if any of them is empty.
    pub fn validated(self) -> Result<Self, CommonError> {
        let contact = Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            company: self.company.trim().to_string(),
            phone: self.phone.trim().to_string(),
        };
        if contact.fields().iter().any(|(_, value)| value.is_empty()) {
            return Err(CommonError::IncompleteContact);
        }
        Ok(contact)
    }

    /// Report and record columns, in display order.
    pub fn fields(&self) -> [(&'static str, &str); 4] {
        [
            ("Name", self.name.as_str()),
            ("Email", self.email.as_str()),
            ("Company", self.company.as_str()),
            ("Phone", self.phone.as_str()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> ContactInfo {
        ContactInfo {
            name: " Ada ".to_string(),
            email: "ada@example.com".to_string(),
            company: "Analytical Engines".to_string(),
            phone: "555-0100".to_string(),
        }
    }

    #[test]
    fn trims_valid_form() {
        let contact = filled().validated().unwrap();
        assert_eq!(contact.name, "Ada");
    }

    #[test]
    fn whitespace_only_field_is_missing() {
        let mut contact = filled();
        contact.phone = "   ".to_string();
        assert!(matches!(contact.validated(), Err(CommonError::IncompleteContact)));
    }

    #[test]
    fn absent_field_reaches_validation() {
        let contact: ContactInfo =
            serde_json::from_str(r#"{"name":"Ada","email":"a@b.c","company":"C"}"#).unwrap();
        assert_eq!(contact.phone, "");
        let err = contact.validated().unwrap_err();
        assert!(matches!(err, CommonError::IncompleteContact));
        assert_eq!(err.to_string(), "Please fill in all fields.");
    }
}
