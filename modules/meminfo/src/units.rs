//! Output units for memory figures.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Unit a kilobyte reading is converted to before it is reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Unit {
    /// Bytes
    Bt,
    /// Kilobytes, as read from the source
    #[default]
    Kb,
    /// Megabytes
    Mb,
    /// Gigabytes
    Gb,
}

impl Unit {
    /// All units in ascending size.
    pub const ALL: [Self; 4] = [Self::Bt, Self::Kb, Self::Mb, Self::Gb];

    /// Name used in requests and in the response.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bt => "bt",
            Self::Kb => "kb",
            Self::Mb => "mb",
            Self::Gb => "gb",
        }
    }

    /// Resolve a requested unit, case-insensitively.
    ///
    /// Missing or unrecognised names silently fall back to `fallback`.
    #[must_use]
    pub fn resolve(requested: Option<&str>, fallback: Self) -> Self {
        requested
            .and_then(|name| name.parse().ok())
            .unwrap_or(fallback)
    }

    /// Convert a kilobyte figure to this unit.
    ///
    /// The unknown sentinel goes through the same arithmetic as any reading.
    #[must_use]
    pub fn convert(self, kb: i64) -> f64 {
        let kb = kb as f64;
        match self {
            Self::Bt => kb * 1024.0,
            Self::Kb => kb,
            Self::Mb => kb / 1024.0,
            Self::Gb => kb / (1024.0 * 1024.0),
        }
    }

    /// Convert a kilobyte figure to a JSON number.
    ///
    /// Bytes and kilobytes stay integral; megabytes and gigabytes are
    /// fractional.
    #[must_use]
    pub fn to_json(self, kb: i64) -> Value {
        match self {
            Self::Kb => Value::from(kb),
            Self::Bt => kb
                .checked_mul(1024)
                .map_or_else(|| Value::from(self.convert(kb)), Value::from),
            Self::Mb | Self::Gb => Value::from(self.convert(kb)),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = UnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bt" => Ok(Self::Bt),
            "kb" => Ok(Self::Kb),
            "mb" => Ok(Self::Mb),
            "gb" => Ok(Self::Gb),
            _ => Err(UnitParseError {
                input: s.to_owned(),
            }),
        }
    }
}

/// Error when parsing an invalid unit name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid unit '{input}'. Valid options: bt, kb, mb, gb")]
pub struct UnitParseError {
    input: String,
}
