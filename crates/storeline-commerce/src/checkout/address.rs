//! Shipping address.

use crate::error::CommerceError;
use serde::{Deserialize, Serialize};

/// A postal address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Address {
    /// Recipient name.
    pub name: String,
    /// Street address.
    pub line1: String,
    /// Apartment, suite, etc.
    pub line2: Option<String>,
    pub city: String,
    /// State, province or county.
    pub region: Option<String>,
    pub postal_code: String,
    /// Country code (e.g., "US").
    pub country: String,
    pub phone: Option<String>,
}

impl Address {
    /// Format as single line.
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.line1.as_str()];
        if let Some(line2) = &self.line2 {
            parts.push(line2);
        }
        parts.push(&self.city);
        if let Some(region) = &self.region {
            parts.push(region);
        }
        parts.push(&self.postal_code);
        parts.push(&self.country);
        parts.join(", ")
    }

    /// Check if the required fields are filled in.
    pub fn is_complete(&self) -> bool {
        [&self.name, &self.line1, &self.city, &self.postal_code, &self.country]
            .iter()
            .all(|field| !field.trim().is_empty())
    }

    /// Trim fields and fail if any required one is missing.
    pub fn validated(mut self) -> Result<Self, CommerceError> {
        for field in [
            &mut self.name,
            &mut self.line1,
            &mut self.city,
            &mut self.postal_code,
        ] {
            *field = field.trim().to_string();
        }
        self.country = self.country.trim().to_uppercase();
        for field in [&mut self.line2, &mut self.region, &mut self.phone] {
            *field = field
                .take()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
        }

        if !self.is_complete() {
            return Err(CommerceError::ValidationError(
                "shipping address requires name, line1, city, postal_code and country".into(),
            ));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Address {
        Address {
            name: "Jane Smith".into(),
            line1: "456 Oak Ave".into(),
            city: "Los Angeles".into(),
            region: Some("CA".into()),
            postal_code: "90001".into(),
            country: "us".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_address_formatting() {
        assert_eq!(sample().one_line(), "456 Oak Ave, Los Angeles, CA, 90001, us");
    }

    #[test]
    fn test_validated_normalizes() {
        let mut addr = sample();
        addr.line2 = Some("  ".into());
        let addr = addr.validated().unwrap();
        assert_eq!(addr.country, "US");
        assert_eq!(addr.line2, None);
    }

    #[test]
    fn test_incomplete_address() {
        let mut addr = sample();
        addr.postal_code = " ".into();
        assert!(!addr.is_complete());
        assert!(addr.validated().is_err());
    }
}
