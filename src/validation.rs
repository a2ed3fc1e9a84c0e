//! Pre-flight checks. These save a round trip; the server stays the authority.

use rust_decimal::Decimal;

use crate::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn max_transfer_amount() -> Decimal {
    Decimal::new(10_000, 0)
}

/// Loose `something@something.something` check, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

pub fn email(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{field} is required")));
    }
    if !is_valid_email(value) {
        return Err(ApiError::Validation(format!("{field} must be a valid email address")));
    }
    Ok(())
}

pub fn required(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// Positive, at most two decimal places.
pub fn amount(value: Decimal) -> Result<(), ApiError> {
    if value <= Decimal::ZERO {
        return Err(ApiError::Validation("Amount must be greater than zero".into()));
    }
    if value.normalize().scale() > 2 {
        return Err(ApiError::Validation(
            "Amount can have at most two decimal places".into(),
        ));
    }
    Ok(())
}

pub fn transfer_amount(value: Decimal) -> Result<(), ApiError> {
    amount(value)?;
    if value > max_transfer_amount() {
        return Err(ApiError::Validation("Maximum amount is $10,000".into()));
    }
    Ok(())
}

pub fn password(value: &str, registering: bool) -> Result<(), ApiError> {
    if registering {
        if value.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters long"
            )));
        }
    } else if value.is_empty() {
        return Err(ApiError::Validation("Password must not be blank".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn emails() {
        assert!(is_valid_email("bob@example.com"));
        assert!(is_valid_email("  bob@example.com "));
        assert!(!is_valid_email("bob@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("bob smith@example.com"));
        assert!(!is_valid_email("bob@@example.com"));
        assert!(!is_valid_email("bob@.com"));
    }

    #[test]
    fn amounts() {
        assert!(amount(dec("25.50")).is_ok());
        assert!(amount(dec("0.01")).is_ok());
        assert!(amount(dec("1.100")).is_ok(), "trailing zeros do not count as decimals");
        assert!(amount(dec("0")).is_err());
        assert!(amount(dec("-3")).is_err());
        assert!(amount(dec("1.005")).is_err());
    }

    #[test]
    fn transfer_amount_has_a_ceiling() {
        assert!(transfer_amount(dec("10000")).is_ok());
        assert_eq!(
            transfer_amount(dec("10000.01")).unwrap_err().to_string(),
            "Maximum amount is $10,000"
        );
    }

    #[test]
    fn passwords() {
        assert!(password("short", true).is_err());
        assert!(password("long enough", true).is_ok());
        assert!(password("x", false).is_ok());
        assert!(password("", false).is_err());
    }
}
