//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Validate a phone number.
///
/// Expects E.164 form: a leading `+`, then 8 to 15 digits with no
/// leading zero.
pub fn validate_phone(phone: &str) -> Result<(), String> {
    if phone.is_empty() {
        return Err("Phone number is required".to_string());
    }

    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = PHONE_REGEX
        .get_or_init(|| Regex::new(r"^\+[1-9]\d{7,14}$").expect("Failed to compile phone regex"));

    if !regex.is_match(phone) {
        return Err("Phone number must be in international format, e.g. +919876543210".to_string());
    }

    Ok(())
}

/// Validate an OTP code: exactly six digits.
pub fn validate_otp_code(code: &str) -> Result<(), String> {
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err("Code must be exactly 6 digits".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_phone_numbers() {
        assert!(validate_phone("+919876543210").is_ok());
        assert!(validate_phone("+14155552671").is_ok());
        assert!(validate_phone("+4930123456").is_ok());
    }

    #[test]
    fn test_invalid_phone_numbers() {
        assert!(validate_phone("").is_err());
        assert!(validate_phone("9876543210").is_err()); // no plus
        assert!(validate_phone("+0123456789").is_err()); // leading zero
        assert!(validate_phone("+91 98765 43210").is_err()); // spaces
        assert!(validate_phone("+12345").is_err()); // too short
        assert!(validate_phone("+1234567890123456").is_err()); // too long
        assert!(validate_phone("+91abc6543210").is_err()); // letters
    }

    #[test]
    fn test_otp_code_format() {
        assert!(validate_otp_code("123456").is_ok());
        assert!(validate_otp_code("000000").is_ok());
        assert!(validate_otp_code("12345").is_err());
        assert!(validate_otp_code("1234567").is_err());
        assert!(validate_otp_code("12345a").is_err());
        assert!(validate_otp_code("").is_err());
    }
}
