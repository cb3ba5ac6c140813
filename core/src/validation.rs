//! Input validation performed before the record store is touched.

use crate::error::QueueError;

/// Longest accepted customer or agent name, in characters.
pub const MAX_NAME_LEN: usize = 200;

/// Trim and check a customer display name.
///
/// # Errors
///
/// [`QueueError::Validation`] when the name is empty after trimming or longer
/// than [`MAX_NAME_LEN`].
pub fn validate_customer_name(raw: &str) -> Result<String, QueueError> {
    non_empty("customer_name", raw)
}

/// Build a customer name from separate first and last names.
///
/// Both parts are required; they are trimmed and joined with one space.
///
/// # Errors
///
/// [`QueueError::Validation`] when either part is empty.
pub fn customer_name_from_parts(first: &str, last: &str) -> Result<String, QueueError> {
    let first = non_empty("first_name", first)?;
    let last = non_empty("last_name", last)?;
    validate_customer_name(&format!("{first} {last}"))
}

/// Trim and check an agent name.
///
/// # Errors
///
/// [`QueueError::Validation`] when the name is empty after trimming.
pub fn validate_agent_name(raw: &str) -> Result<String, QueueError> {
    non_empty("agent_name", raw)
}

fn non_empty(field: &str, raw: &str) -> Result<String, QueueError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(QueueError::Validation(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(QueueError::Validation(format!(
            "{field} must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn customer_name_is_trimmed() {
        assert_eq!(validate_customer_name("  Grace  ").unwrap(), "Grace");
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(matches!(
            validate_customer_name("   "),
            Err(QueueError::Validation(_))
        ));
        assert!(matches!(
            validate_agent_name(""),
            Err(QueueError::Validation(_))
        ));
    }

    #[test]
    fn split_names_are_joined() {
        assert_eq!(
            customer_name_from_parts(" Ada ", "Lovelace").unwrap(),
            "Ada Lovelace"
        );
        assert!(customer_name_from_parts("Ada", " ").is_err());
    }

    #[test]
    fn overlong_name_is_rejected() {
        let name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(validate_customer_name(&name).is_err());
    }

    proptest! {
        #[test]
        fn accepted_names_are_trimmed_and_non_empty(raw in "\\PC{0,40}") {
            if let Ok(name) = validate_customer_name(&raw) {
                prop_assert!(!name.is_empty());
                prop_assert_eq!(name.trim(), name.as_str());
            }
        }
    }
}
