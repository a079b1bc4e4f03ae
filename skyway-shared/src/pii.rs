use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps passenger identity data (passport numbers, names) so that log macros
/// never print the full value. Serialization still yields the real value,
/// API responses need it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

const VISIBLE_SUFFIX: usize = 3;

impl<T: AsRef<str>> Masked<T> {
    /// Everything but the last few characters replaced by `*`.
    pub fn redacted(&self) -> String {
        let value = self.0.as_ref();
        let len = value.chars().count();
        if len <= VISIBLE_SUFFIX {
            return "*".repeat(len);
        }
        let tail: String = value.chars().skip(len - VISIBLE_SUFFIX).collect();
        format!("{}{}", "*".repeat(len - VISIBLE_SUFFIX), tail)
    }
}

impl<T: AsRef<str>> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.redacted())
    }
}

impl<T: AsRef<str>> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.redacted())
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

impl<T> Masked<T> {
    pub fn into_inner(self) -> T {
        self.0
    }

    pub fn inner(&self) -> &T {
        &self.0
    }
}

impl From<String> for Masked<String> {
    fn from(value: String) -> Self {
        Masked(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_all_but_suffix() {
        let passport = Masked("U12345678".to_string());
        assert_eq!(format!("{:?}", passport), "******678");
        assert_eq!(passport.to_string(), "******678");
    }

    #[test]
    fn short_values_are_fully_hidden() {
        assert_eq!(Masked("AB".to_string()).redacted(), "**");
    }

    #[test]
    fn serialization_keeps_real_value() {
        let passport = Masked("U12345678".to_string());
        assert_eq!(serde_json::to_string(&passport).unwrap(), "\"U12345678\"");
    }
}
