//! Safe-name predicate shared by note and user names.
//!
//! A safe name is usable as a store-key component: non-empty, shorter than
//! 255 characters, no `/`, no NUL.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Names must be strictly shorter than this many characters.
pub const MAX_NAME_CHARS: usize = 255;

/// Which safe-name rule a candidate broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    Empty,
    TooLong { chars: usize },
    ContainsSlash,
    ContainsNul,
}

impl Display for NameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "name must not be empty"),
            Self::TooLong { chars } => write!(
                f,
                "name has {chars} characters, must be shorter than {MAX_NAME_CHARS}"
            ),
            Self::ContainsSlash => write!(f, "name must not contain `/`"),
            Self::ContainsNul => write!(f, "name must not contain a NUL byte"),
        }
    }
}

impl Error for NameError {}

/// Checks `name` against the safe-name rules.
pub fn validate_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    let chars = name.chars().count();
    if chars >= MAX_NAME_CHARS {
        return Err(NameError::TooLong { chars });
    }
    if name.contains('/') {
        return Err(NameError::ContainsSlash);
    }
    if name.contains('\0') {
        return Err(NameError::ContainsNul);
    }
    Ok(())
}

pub fn is_safe_name(name: &str) -> bool {
    validate_name(name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::{is_safe_name, validate_name, NameError, MAX_NAME_CHARS};

    #[test]
    fn accepts_ordinary_names() {
        assert!(is_safe_name("Shopping"));
        assert!(is_safe_name("a@example.com"));
        assert!(is_safe_name(&"x".repeat(MAX_NAME_CHARS - 1)));
    }

    #[test]
    fn reports_the_broken_rule() {
        assert_eq!(validate_name(""), Err(NameError::Empty));
        assert_eq!(validate_name("x/y"), Err(NameError::ContainsSlash));
        assert_eq!(validate_name("x\0y"), Err(NameError::ContainsNul));
        assert_eq!(
            validate_name(&"a".repeat(MAX_NAME_CHARS)),
            Err(NameError::TooLong {
                chars: MAX_NAME_CHARS
            })
        );
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // 254 two-byte characters stay under the limit.
        assert!(is_safe_name(&"é".repeat(MAX_NAME_CHARS - 1)));
    }
}
