//! Field checks shared by the input types.

use crate::error::ValidationError;

pub const MAX_NAME_CHARS: usize = 50;

pub(crate) fn name(errors: &mut ValidationError, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, "must not be blank");
    } else if value.chars().count() > MAX_NAME_CHARS {
        errors.add(
            field,
            format!("must be at most {} characters", MAX_NAME_CHARS),
        );
    }
}

pub(crate) fn required_text(errors: &mut ValidationError, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, "must not be blank");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_limit_counts_characters_not_bytes() {
        let mut errors = ValidationError::new();
        name(&mut errors, "name", &"я".repeat(MAX_NAME_CHARS));
        assert!(errors.is_empty());

        name(&mut errors, "name", &"я".repeat(MAX_NAME_CHARS + 1));
        assert!(errors.has_field("name"));
    }

    #[test]
    fn blank_values_are_rejected() {
        let mut errors = ValidationError::new();
        name(&mut errors, "name", "   ");
        required_text(&mut errors, "description", "");
        assert_eq!(errors.errors.len(), 2);
    }
}
