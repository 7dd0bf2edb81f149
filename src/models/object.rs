//! Identifier of a content object on disk.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Random 128-bit identifier of a stored payload.
///
/// Always rendered as a lowercase hyphenated string; the first two characters
/// of that rendering select the shard directory. Only values that parse as a
/// UUID can be turned into an `ObjectId`, so nothing else ever reaches a
/// filesystem path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(Uuid);

impl ObjectId {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an id as handed back by the record store. Case is ignored.
    pub fn parse(raw: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(raw.trim()).map(Self)
    }

    /// Name of the first-level shard directory.
    pub fn shard(&self) -> String {
        self.to_string()[..2].to_string()
    }
}

impl FromStr for ObjectId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}
