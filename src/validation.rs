use phonenumber::{country::Id as CountryId, Mode};
use regex::Regex;

/// Check if email is valid.
///
/// Rejects obviously fake addresses typed into the form to get past the
/// required-field check (`test@test.com`, long digit runs).
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.len() < 5 || !email.contains('@') || !email.contains('.') {
        return false;
    }

    let lowered = email.to_ascii_lowercase();
    let fake_patterns = ["test@test.", "none@none.", "no@email.", "000000", "999999"];
    if let Some(pattern) = fake_patterns.iter().find(|p| lowered.contains(*p)) {
        tracing::warn!(
            "❌ Invalid email detected (fake pattern '{}'): {}",
            pattern,
            email
        );
        return false;
    }

    // RFC 5322 simplified: local@domain.tld
    let is_match = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
    )
    .map(|re| re.is_match(email))
    .unwrap_or(false);

    if !is_match {
        tracing::warn!("❌ Invalid email format: {}", email);
    }
    is_match
}

/// Validate and normalize a US phone number.
///
/// # Returns
///
/// * `(true, "+13019005171")` for a valid number, E.164 formatted.
/// * `(false, reason)` otherwise.
pub fn validate_us_phone(raw: &str) -> (bool, String) {
    let digits = raw.chars().filter(|c| c.is_ascii_digit()).count();
    if raw.trim().is_empty() || digits < 10 {
        return (false, "Phone too short".to_string());
    }

    match phonenumber::parse(Some(CountryId::US), raw) {
        Ok(number) => {
            if phonenumber::is_valid(&number) {
                let formatted = number.format().mode(Mode::E164).to_string();
                tracing::debug!("✓ Valid US phone: {} → {}", raw, formatted);
                (true, formatted)
            } else {
                tracing::warn!("❌ Invalid US phone number: {}", raw);
                (false, "Invalid US phone number".to_string())
            }
        }
        Err(e) => {
            tracing::warn!("❌ Failed to parse US phone '{}': {:?}", raw, e);
            (false, format!("Parse error: {:?}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("facilities@acme-storage.com"));
        assert!(is_valid_email("dana.reyes+claims@example.co.uk"));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("not_an_email"));
        assert!(!is_valid_email("user@domain"));
        assert!(!is_valid_email("test@test.com"));
        assert!(!is_valid_email("user 1@example.com"));
    }

    #[test]
    fn test_dispatch_lines_are_valid() {
        assert_eq!(
            validate_us_phone("301-900-5171"),
            (true, "+13019005171".to_string())
        );
        assert_eq!(
            validate_us_phone("(202) 796-7422"),
            (true, "+12027967422".to_string())
        );
        assert_eq!(
            validate_us_phone("+1 703 844 4204"),
            (true, "+17038444204".to_string())
        );
    }

    #[test]
    fn test_short_phones_rejected() {
        assert!(!validate_us_phone("").0);
        assert!(!validate_us_phone("555-1234").0);
    }
}
