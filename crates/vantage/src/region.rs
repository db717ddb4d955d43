use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Geographic vantage point a checker runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Ams,
    Iad,
    Hkg,
    Jnb,
    Syd,
    Gru,
}

/// How much detail [`Region::format`] renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionFormat {
    /// `ams 🇳🇱`
    Short,
    /// `Amsterdam, Netherlands 🇳🇱`
    Long,
}

impl Region {
    /// Every region a checker is deployed to, in catalogue order
    pub const ALL: [Region; 6] =
        [Region::Ams, Region::Iad, Region::Hkg, Region::Jnb, Region::Syd, Region::Gru];

    pub fn code(&self) -> &'static str {
        match self {
            Region::Ams => "ams",
            Region::Iad => "iad",
            Region::Hkg => "hkg",
            Region::Jnb => "jnb",
            Region::Syd => "syd",
            Region::Gru => "gru",
        }
    }

    pub fn location(&self) -> &'static str {
        match self {
            Region::Ams => "Amsterdam, Netherlands",
            Region::Iad => "Ashburn, Virginia, USA",
            Region::Hkg => "Hong Kong, Hong Kong",
            Region::Jnb => "Johannesburg, South Africa",
            Region::Syd => "Sydney, Australia",
            Region::Gru => "Sao Paulo, Brazil",
        }
    }

    pub fn flag(&self) -> &'static str {
        match self {
            Region::Ams => "🇳🇱",
            Region::Iad => "🇺🇸",
            Region::Hkg => "🇭🇰",
            Region::Jnb => "🇿🇦",
            Region::Syd => "🇦🇺",
            Region::Gru => "🇧🇷",
        }
    }

    /// Continent the region belongs to (simplified mapping)
    pub fn continent(&self) -> &'static str {
        match self {
            Region::Ams => "Europe",
            Region::Iad => "North America",
            Region::Hkg => "Asia",
            Region::Jnb => "Africa",
            Region::Syd => "Oceania",
            Region::Gru => "South America",
        }
    }

    /// Format region for display
    pub fn format(&self, format: RegionFormat) -> String {
        match format {
            RegionFormat::Short => format!("{} {}", self.code(), self.flag()),
            RegionFormat::Long => format!("{} {}", self.location(), self.flag()),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when a region code is not in the catalogue
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown region: {0}")]
pub struct UnknownRegion(pub String);

impl FromStr for Region {
    type Err = UnknownRegion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Region::ALL
            .into_iter()
            .find(|region| region.code() == code)
            .ok_or_else(|| UnknownRegion(s.to_string()))
    }
}
