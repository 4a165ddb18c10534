//! Validation helpers for DTOs.

use crate::dto::operator::RosterEntryInput;

/// A roster row is importable when both its code and name are non-blank
/// after trimming. Blank rows are skipped rather than rejected so a partly
/// messy import still goes through.
pub fn is_importable_row(entry: &RosterEntryInput) -> bool {
    !entry.code.trim().is_empty() && !entry.name.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(code: &str, name: &str) -> RosterEntryInput {
        RosterEntryInput {
            id: None,
            code: code.into(),
            name: name.into(),
            department: None,
        }
    }

    #[test]
    fn test_importable_row_valid() {
        assert!(is_importable_row(&row("001", "Alice")));
        assert!(is_importable_row(&row("x7", "B")));
    }

    #[test]
    fn test_importable_row_blank_fields() {
        assert!(!is_importable_row(&row("", "Alice")));
        assert!(!is_importable_row(&row("001", "")));
        assert!(!is_importable_row(&row("   ", "Alice")));
        assert!(!is_importable_row(&row("001", "  \t")));
    }
}
