//! Quantity units.
//!
//! Units are a closed pair (`units`, `kg`) plus shop-defined custom units.
//! A unit is stable for a given item across its lifetime: mixed-unit updates
//! are rejected or skipped by the callers, never converted.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Quantity unit of a stock item or line item.
///
/// Serialized as a plain string (`"units"`, `"kg"`, or the custom label).
/// Custom labels compare case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Unit {
    /// Discrete pieces.
    Units,
    /// Weight in kilograms (fractional quantities allowed).
    Kg,
    /// Shop-defined unit label (e.g. "litre", "dozen").
    Custom(String),
}

impl Unit {
    pub fn parse(s: &str) -> Self {
        match s {
            "units" => Unit::Units,
            "kg" => Unit::Kg,
            other => Unit::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Unit::Units => "units",
            Unit::Kg => "kg",
            Unit::Custom(s) => s.as_str(),
        }
    }
}

impl core::fmt::Display for Unit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Unit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Unit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Unit::parse(&s))
    }
}
