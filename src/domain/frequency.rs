//! Reminder frequency: which calendar days a task takes part in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RemindrError;

/// Recurrence policy for a task's reminder days
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Frequency {
    Daily,
    EveryOtherDay,
    Weekly,
    /// A stored value this build does not recognize. Participates every day.
    Unknown(String),
}

impl Frequency {
    /// All frequencies a user can pick
    pub const ALL: [Frequency; 3] = [Frequency::Daily, Frequency::EveryOtherDay, Frequency::Weekly];

    /// Storage / wire representation
    pub fn as_str(&self) -> &str {
        match self {
            Frequency::Daily => "daily",
            Frequency::EveryOtherDay => "every_other_day",
            Frequency::Weekly => "weekly",
            Frequency::Unknown(raw) => raw,
        }
    }

    /// Human-readable label
    pub fn display_name(&self) -> &str {
        match self {
            Frequency::Daily => "Daily",
            Frequency::EveryOtherDay => "Every other day",
            Frequency::Weekly => "Weekly",
            Frequency::Unknown(raw) => raw,
        }
    }

    /// Map a stored value back to a frequency without failing.
    pub fn from_stored(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|_| Frequency::Unknown(raw.to_string()))
    }
}

impl FromStr for Frequency {
    type Err = RemindrError;

    /// Case-sensitive; only the three known names parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "every_other_day" => Ok(Frequency::EveryOtherDay),
            "weekly" => Ok(Frequency::Weekly),
            other => Err(RemindrError::InvalidInput(format!("unknown frequency: {:?}", other))),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Frequency {
    fn from(raw: String) -> Self {
        Frequency::from_stored(&raw)
    }
}

impl From<Frequency> for String {
    fn from(freq: Frequency) -> Self {
        freq.as_str().to_string()
    }
}
