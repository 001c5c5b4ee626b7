use eyecare_core::{LedgerError, LedgerResult};

const MAX_SHORT_TEXT: usize = 255;
const MAX_LONG_TEXT: usize = 2000;

pub(crate) fn normalize_required(field: &'static str, value: &str) -> LedgerResult<String> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(LedgerError::validation(field, format!("{field} is required")));
    }
    check_length(field, normalized, MAX_SHORT_TEXT)?;
    Ok(normalized.to_string())
}

/// Blank strings become `None`.
pub(crate) fn normalize_optional(
    field: &'static str,
    value: Option<String>,
) -> LedgerResult<Option<String>> {
    normalize_bounded(field, value, MAX_SHORT_TEXT)
}

pub(crate) fn normalize_optional_long(
    field: &'static str,
    value: Option<String>,
) -> LedgerResult<Option<String>> {
    normalize_bounded(field, value, MAX_LONG_TEXT)
}

fn normalize_bounded(
    field: &'static str,
    value: Option<String>,
    max_len: usize,
) -> LedgerResult<Option<String>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let normalized = value.trim();
    if normalized.is_empty() {
        return Ok(None);
    }
    check_length(field, normalized, max_len)?;
    Ok(Some(normalized.to_string()))
}

fn check_length(field: &'static str, value: &str, max_len: usize) -> LedgerResult<()> {
    if value.chars().count() > max_len {
        return Err(LedgerError::validation(
            field,
            format!("{field} must be at most {max_len} characters"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blanks_collapse_to_none() {
        assert_eq!(normalize_optional("notes", Some("  ".to_string())).unwrap(), None);
        assert_eq!(
            normalize_optional("notes", Some(" lot 7 ".to_string())).unwrap(),
            Some("lot 7".to_string())
        );
    }

    #[test]
    fn required_and_length_limits() {
        assert!(normalize_required("name", "   ").is_err());
        let long = "x".repeat(256);
        assert!(matches!(
            normalize_optional("supplier", Some(long.clone())),
            Err(LedgerError::Validation { field: "supplier", .. })
        ));
        assert!(normalize_optional_long("notes", Some(long)).is_ok());
    }
}
