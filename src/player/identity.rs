use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::shared::AppError;

/// Canonical identifier for a player, derived from free-text input.
///
/// The only way to build one is through [`PlayerKey::parse`], so every key in
/// the system is trimmed and upper-cased. Deserialisation goes through the same
/// path, which is what re-normalises keys found in older snapshots.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayerKey(String);

impl PlayerKey {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        normalize(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Trims surrounding whitespace and folds to upper case.
///
/// Idempotent: normalising an already-normalised key yields the same key.
pub fn normalize(raw: &str) -> Result<PlayerKey, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidName);
    }
    Ok(PlayerKey(trimmed.to_uppercase()))
}

impl fmt::Display for PlayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PlayerKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s)
    }
}

impl TryFrom<String> for PlayerKey {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        normalize(&value)
    }
}

impl From<PlayerKey> for String {
    fn from(key: PlayerKey) -> Self {
        key.0
    }
}

impl AsRef<str> for PlayerKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("alice", "ALICE")]
    #[case("  Bob  ", "BOB")]
    #[case("\tcarol\n", "CAROL")]
    #[case("Mary Jane", "MARY JANE")]
    #[case("DAVE", "DAVE")]
    fn normalizes_names(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize(raw).unwrap().as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\t\n")]
    fn rejects_blank_names(#[case] raw: &str) {
        assert!(matches!(normalize(raw), Err(AppError::InvalidName)));
    }

    #[rstest]
    #[case("alice")]
    #[case("  Mixed Case  ")]
    #[case("straße")]
    fn normalize_is_idempotent(#[case] raw: &str) {
        let once = normalize(raw).unwrap();
        let twice = normalize(once.as_str()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn deserializing_renormalizes() {
        let key: PlayerKey = serde_json::from_str("\" alice \"").unwrap();
        assert_eq!(key.as_str(), "ALICE");

        let blank: Result<PlayerKey, _> = serde_json::from_str("\"  \"");
        assert!(blank.is_err());
    }
}
