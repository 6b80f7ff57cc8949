use serde::{Serialize, Deserialize, Serializer};
use std::fmt;

/// Wrapper for sensitive values (recipient phones, contact numbers) that only
/// reveals the trailing characters in Debug/Display output.
///
/// Serialization is transparent: API payloads and provider requests need the
/// real value, log macros such as `tracing::info!("{}", phone)` do not.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Masked<T>(pub T);

const VISIBLE_TAIL: usize = 4;

fn mask(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    if chars.len() <= VISIBLE_TAIL {
        return "*".repeat(chars.len().max(1));
    }
    let tail: String = chars[chars.len() - VISIBLE_TAIL..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - VISIBLE_TAIL), tail)
}

impl<T: AsRef<str>> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", mask(self.0.as_ref()))
    }
}

impl<T: AsRef<str>> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", mask(self.0.as_ref()))
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_is_masked_in_display() {
        let phone = Masked("+2348012345678".to_string());
        assert_eq!(format!("{}", phone), "**********5678");
        assert_eq!(format!("{:?}", phone), "**********5678");
    }

    #[test]
    fn test_short_values_are_fully_masked() {
        assert_eq!(format!("{}", Masked("123")), "***");
        assert_eq!(format!("{}", Masked("")), "*");
    }

    #[test]
    fn test_serialization_is_transparent() {
        let phone = Masked("08012345678".to_string());
        assert_eq!(serde_json::to_string(&phone).unwrap(), "\"08012345678\"");
    }
}
