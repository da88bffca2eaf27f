//! Input validation for account identities and names
//!
//! Validated newtypes keep their fields private so the only way to obtain
//! one is through `new()`.

use std::fmt;

use super::models::AccountIdentity;

// ============================================================================
// Validation Errors
// ============================================================================

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid length for {field}: expected {min}-{max}, got {actual}")]
    InvalidLength {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Invalid format for {field}: '{value}' (expected: {expected})")]
    InvalidFormat {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

// ============================================================================
// SortCode
// ============================================================================

/// Validated sort code in `NN-NN-NN` form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortCode(String);

impl SortCode {
    /// # Examples
    /// ```
    /// use sortcode_ledger::account::validation::SortCode;
    ///
    /// assert!(SortCode::new("53-68-92").is_ok());
    /// assert!(SortCode::new("536892").is_err());
    /// ```
    pub fn new(value: &str) -> Result<Self, ValidationError> {
        let value = value.trim();
        let bytes = value.as_bytes();
        let well_formed = bytes.len() == 8
            && bytes.iter().enumerate().all(|(i, b)| {
                if i == 2 || i == 5 {
                    *b == b'-'
                } else {
                    b.is_ascii_digit()
                }
            });

        if !well_formed {
            return Err(ValidationError::InvalidFormat {
                field: "sort_code",
                value: value.to_string(),
                expected: "NN-NN-NN",
            });
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SortCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// AccountNumber
// ============================================================================

pub const ACCOUNT_NUMBER_LEN: usize = 8;

/// Validated 8-digit account number
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountNumber(String);

impl AccountNumber {
    pub fn new(value: &str) -> Result<Self, ValidationError> {
        let value = value.trim();
        if value.len() != ACCOUNT_NUMBER_LEN {
            return Err(ValidationError::InvalidLength {
                field: "account_number",
                min: ACCOUNT_NUMBER_LEN,
                max: ACCOUNT_NUMBER_LEN,
                actual: value.len(),
            });
        }
        if !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidFormat {
                field: "account_number",
                value: value.to_string(),
                expected: "digits only",
            });
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Names
// ============================================================================

pub const MAX_NAME_LEN: usize = 100;

/// Validate a bank or owner name and return it trimmed
pub fn validate_name(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    let len = value.chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(ValidationError::InvalidLength {
            field,
            min: 1,
            max: MAX_NAME_LEN,
            actual: len,
        });
    }
    Ok(value.to_string())
}

/// Validate both halves of an identity and return the normalised form
pub fn validate_identity(identity: &AccountIdentity) -> Result<AccountIdentity, ValidationError> {
    let sort_code = SortCode::new(&identity.sort_code)?;
    let account_number = AccountNumber::new(&identity.account_number)?;
    Ok(AccountIdentity::new(
        sort_code.as_str(),
        account_number.as_str(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_code_valid() {
        assert_eq!(SortCode::new("12-34-56").unwrap().as_str(), "12-34-56");
        assert_eq!(SortCode::new(" 00-00-00 ").unwrap().as_str(), "00-00-00");
    }

    #[test]
    fn test_sort_code_invalid() {
        for bad in ["123456", "12-3456", "12-34-5", "ab-cd-ef", "12_34_56", ""] {
            assert!(SortCode::new(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_account_number() {
        assert!(AccountNumber::new("00012345").is_ok());
        assert!(matches!(
            AccountNumber::new("1234"),
            Err(ValidationError::InvalidLength { actual: 4, .. })
        ));
        assert!(matches!(
            AccountNumber::new("1234567a"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("owner_name", "  Ada  ").unwrap(), "Ada");
        assert!(validate_name("owner_name", "   ").is_err());
        assert!(validate_name("bank_name", &"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_identity_trims() {
        let identity = AccountIdentity::new(" 12-34-56", "00012345 ");
        let normalised = validate_identity(&identity).unwrap();
        assert_eq!(normalised, AccountIdentity::new("12-34-56", "00012345"));
    }
}
