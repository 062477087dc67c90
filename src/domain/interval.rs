//! Series aggregation granularity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::StockError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1wk")]
    Weekly,
    #[serde(rename = "1mo")]
    Monthly,
}

impl Interval {
    pub const ALL: [Self; 3] = [Self::Daily, Self::Weekly, Self::Monthly];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "1d",
            Self::Weekly => "1wk",
            Self::Monthly => "1mo",
        }
    }

    /// Coarseness rank; a series can only be resampled to an equal or higher rank.
    pub const fn rank(self) -> u8 {
        match self {
            Self::Daily => 0,
            Self::Weekly => 1,
            Self::Monthly => 2,
        }
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::Daily
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = StockError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1d" | "daily" => Ok(Self::Daily),
            "1wk" | "weekly" => Ok(Self::Weekly),
            "1mo" | "monthly" => Ok(Self::Monthly),
            other => Err(StockError::validation(
                "interval",
                format!("'{other}' is not one of 1d, 1wk, 1mo"),
            )),
        }
    }
}
