//! Money Conversion Module
//!
//! Conversion between client-facing amount strings and the internal
//! fixed-point `Decimal` representation. Every amount entering the ledger
//! from outside goes through [`parse_amount`].
//!
//! ## Internal Representation
//! - Balances and amounts are `rust_decimal::Decimal`, never floats
//! - Client amounts carry at most [`MONEY_SCALE`] decimal places (pence)
//! - Stored values are normalised to exactly [`MONEY_SCALE`] places
//!
//! ```
//! use sortcode_ledger::money::{normalize, parse_amount};
//! use rust_decimal::Decimal;
//!
//! let amount = parse_amount("12.5").unwrap();
//! assert_eq!(amount.to_string(), "12.50");
//! assert!(normalize(Decimal::new(1, 3)).is_err());
//! ```

use rust_decimal::prelude::*;
use thiserror::Error;

/// Decimal places carried by every monetary value
pub const MONEY_SCALE: u32 = 2;

/// Money conversion errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Amount must not be signed")]
    SignedAmount,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Parse a client amount string into a scaled `Decimal`.
///
/// Zero is accepted here: whether zero is a legal amount is a decision of
/// the operation consuming it, not of the parser.
///
/// # Errors
/// * `SignedAmount` - leading `-` or `+`
/// * `PrecisionOverflow` - more than [`MONEY_SCALE`] fractional digits
/// * `InvalidFormat` - anything that is not `digits[.digits]`
pub fn parse_amount(amount_str: &str) -> Result<Decimal, MoneyError> {
    let amount_str = amount_str.trim();
    if amount_str.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }

    if amount_str.starts_with('-') || amount_str.starts_with('+') {
        return Err(MoneyError::SignedAmount);
    }

    let parts: Vec<&str> = amount_str.split('.').collect();
    let (whole, frac) = match parts.len() {
        1 => (parts[0], ""),
        2 => {
            // "5." and ".5" are ambiguous for humans, reject both
            if parts[0].is_empty() {
                return Err(MoneyError::InvalidFormat(
                    "missing leading zero (e.g., use 0.5 instead of .5)".into(),
                ));
            }
            if parts[1].is_empty() {
                return Err(MoneyError::InvalidFormat(
                    "missing fractional part (e.g., use 5.0 instead of 5.)".into(),
                ));
            }
            (parts[0], parts[1])
        }
        _ => {
            return Err(MoneyError::InvalidFormat(format!(
                "too many decimal points: {}",
                amount_str
            )));
        }
    };

    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(MoneyError::InvalidFormat(format!(
            "non-digit characters in {}",
            amount_str
        )));
    }

    let provided = frac.len() as u32;
    if provided > MONEY_SCALE {
        return Err(MoneyError::PrecisionOverflow {
            provided,
            max: MONEY_SCALE,
        });
    }

    let mut value = Decimal::from_str(amount_str)
        .map_err(|e| MoneyError::InvalidFormat(format!("{}: {}", amount_str, e)))?;
    value.rescale(MONEY_SCALE);
    Ok(value)
}

/// Bring an amount to exactly [`MONEY_SCALE`] places.
///
/// Trailing zeros are dropped first, so `1.000` is accepted. A value that
/// still needs more than [`MONEY_SCALE`] places is refused, never rounded.
pub fn normalize(value: Decimal) -> Result<Decimal, MoneyError> {
    let mut value = value.normalize();
    let provided = value.scale();
    if provided > MONEY_SCALE {
        return Err(MoneyError::PrecisionOverflow {
            provided,
            max: MONEY_SCALE,
        });
    }
    value.rescale(MONEY_SCALE);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_parse_amount_valid() {
        assert_eq!(parse_amount("100").unwrap(), Decimal::new(10000, 2));
        assert_eq!(parse_amount("0.5").unwrap(), Decimal::new(50, 2));
        assert_eq!(parse_amount(" 40.25 ").unwrap(), Decimal::new(4025, 2));
        assert_eq!(parse_amount("0").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_parse_amount_rejects_sign() {
        assert_eq!(parse_amount("-1"), Err(MoneyError::SignedAmount));
        assert_eq!(parse_amount("+1"), Err(MoneyError::SignedAmount));
    }

    #[test]
    fn test_parse_amount_precision() {
        assert_eq!(
            parse_amount("1.001"),
            Err(MoneyError::PrecisionOverflow {
                provided: 3,
                max: 2
            })
        );
    }

    #[test]
    fn test_parse_amount_invalid_format() {
        assert!(matches!(parse_amount(""), Err(MoneyError::InvalidFormat(_))));
        assert!(matches!(parse_amount(".5"), Err(MoneyError::InvalidFormat(_))));
        assert!(matches!(parse_amount("5."), Err(MoneyError::InvalidFormat(_))));
        assert!(matches!(parse_amount("1.2.3"), Err(MoneyError::InvalidFormat(_))));
        assert!(matches!(parse_amount("abc"), Err(MoneyError::InvalidFormat(_))));
        assert!(matches!(parse_amount("1e3"), Err(MoneyError::InvalidFormat(_))));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Decimal::new(60, 0)).unwrap().to_string(), "60.00");
        assert_eq!(normalize(Decimal::new(5, 1)).unwrap().to_string(), "0.50");
        assert_eq!(normalize(Decimal::new(12000, 3)).unwrap().to_string(), "12.00");
        assert_eq!(normalize(Decimal::ZERO).unwrap().scale(), MONEY_SCALE);
    }

    #[test]
    fn test_normalize_refuses_sub_pence() {
        assert_eq!(
            normalize(Decimal::new(12345, 3)),
            Err(MoneyError::PrecisionOverflow {
                provided: 3,
                max: 2
            })
        );
        assert_eq!(
            normalize(Decimal::new(5, 4)),
            Err(MoneyError::PrecisionOverflow {
                provided: 4,
                max: 2
            })
        );
    }
}
