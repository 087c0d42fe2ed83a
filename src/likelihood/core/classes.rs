//! Observable classes of an aggregated kinetic model.
//!
//! Hidden states are partitioned into a closed set of observable classes.
//! Only the class sequence of a trajectory is observed; see
//! [`StatePartition`](crate::likelihood::core::rate_matrix::StatePartition)
//! for the state → class map.
use crate::likelihood::errors::LikelihoodError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Observable class of a dwell segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservableClass {
    Bright,
    Dark,
}

impl ObservableClass {
    /// Lowercase label used in trajectory files and messages.
    pub fn label(&self) -> &'static str {
        match self {
            ObservableClass::Bright => "bright",
            ObservableClass::Dark => "dark",
        }
    }
}

impl std::fmt::Display for ObservableClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ObservableClass {
    type Err = LikelihoodError;

    /// Parse a class label (case-insensitive, surrounding whitespace ignored).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bright" => Ok(ObservableClass::Bright),
            "dark" => Ok(ObservableClass::Dark),
            _ => Err(LikelihoodError::UnknownClass { label: s.to_string() }),
        }
    }
}
