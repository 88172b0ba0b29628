//! Memory statistics reader for sysmod-rs.
//!
//! Scans `/proc/meminfo` line by line and picks up the `MemFree`, `MemTotal`
//! and `MemAvailable` figures. Values are taken as kilobytes; the unit suffix
//! on each line is never looked at.

use serde_json::{Map, Value};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;
use sysmod_rs_core::ModuleError;

/// Default location of the kernel memory statistics.
pub const PROC_MEMINFO_PATH: &str = "/proc/meminfo";

/// Value reported for a field that was never found in the source.
pub const UNKNOWN: i64 = -1;

/// One of the memory fields a request can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemField {
    /// `MemFree`, requested as `free`
    Free,
    /// `MemTotal`, requested as `total`
    Total,
    /// `MemAvailable`, requested as `avail`
    Available,
}

impl MemField {
    /// All fields in documentation order.
    pub const ALL: [Self; 3] = [Self::Free, Self::Total, Self::Available];

    /// Order in which labels are tested against a source line.
    const SCAN_ORDER: [Self; 3] = [Self::Available, Self::Total, Self::Free];

    /// Name used in the request options list.
    #[must_use]
    pub const fn option_name(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Total => "total",
            Self::Available => "avail",
        }
    }

    /// Key used in the response `data` object.
    #[must_use]
    pub const fn output_key(self) -> &'static str {
        match self {
            Self::Free => "mem-free",
            Self::Total => "mem-total",
            Self::Available => "mem-available",
        }
    }

    /// Label marking the field in the source text.
    #[must_use]
    pub const fn source_label(self) -> &'static str {
        match self {
            Self::Free => "MemFree:",
            Self::Total => "MemTotal:",
            Self::Available => "MemAvailable:",
        }
    }

    /// Short human description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Free => "Free physical memory",
            Self::Total => "Total physical memory",
            Self::Available => "Memory available for new workloads without swapping",
        }
    }
}

impl fmt::Display for MemField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.option_name())
    }
}

impl FromStr for MemField {
    type Err = UnknownFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.option_name() == s)
            .ok_or_else(|| UnknownFieldError { name: s.to_owned() })
    }
}

/// Error returned when a requested option names no known field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown option: {name}")]
pub struct UnknownFieldError {
    /// The option as it appeared in the request
    pub name: String,
}

/// Memory figures from one scan of the source, in kilobytes.
///
/// `None` means the field's label never matched, or matched without a number
/// following it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemInfo {
    /// Free physical memory
    pub mem_free: Option<u64>,
    /// Total physical memory
    pub mem_total: Option<u64>,
    /// Available physical memory
    pub mem_available: Option<u64>,
}

impl MemInfo {
    /// Read `/proc/meminfo`.
    ///
    /// Never fails: an unreadable source yields a snapshot with every field
    /// unknown.
    #[must_use]
    pub fn read() -> Self {
        Self::from_path(Path::new(PROC_MEMINFO_PATH))
    }

    /// Read a meminfo file from an arbitrary path, leniently.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        Self::probe(path).unwrap_or_else(|e| {
            tracing::warn!("Could not open {}: {}", path.display(), e);
            Self::default()
        })
    }

    /// Read a meminfo file, reporting I/O failures instead of hiding them.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::Io`] if the file cannot be opened or read.
    pub fn probe(path: &Path) -> Result<Self, ModuleError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Scan meminfo text from any buffered reader.
    ///
    /// Lines that are not valid UTF-8 are decoded lossily.
    pub fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, ModuleError> {
        let mut info = Self::default();
        let mut line = Vec::new();

        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            info.scan_line(&String::from_utf8_lossy(&line));
        }

        Ok(info)
    }

    /// Scan meminfo content held in memory.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut info = Self::default();
        for line in content.lines() {
            info.scan_line(line);
        }
        info
    }

    /// Apply one source line. At most one field is updated per line, and a
    /// later match for the same label overwrites the earlier one.
    fn scan_line(&mut self, line: &str) {
        for field in MemField::SCAN_ORDER {
            let label = field.source_label();
            if let Some(offset) = line.find(label) {
                *self.slot(field) = parse_number_after(&line[offset + label.len()..]);
                return;
            }
        }
    }

    fn slot(&mut self, field: MemField) -> &mut Option<u64> {
        match field {
            MemField::Free => &mut self.mem_free,
            MemField::Total => &mut self.mem_total,
            MemField::Available => &mut self.mem_available,
        }
    }

    /// Value of a field in kilobytes, if it was found.
    #[must_use]
    pub const fn get(&self, field: MemField) -> Option<u64> {
        match field {
            MemField::Free => self.mem_free,
            MemField::Total => self.mem_total,
            MemField::Available => self.mem_available,
        }
    }

    /// Value of a field in kilobytes, with [`UNKNOWN`] standing in for a
    /// missing one.
    #[must_use]
    pub fn raw_kb(&self, field: MemField) -> i64 {
        match self.get(field) {
            Some(kb) => i64::try_from(kb).unwrap_or(i64::MAX),
            None => UNKNOWN,
        }
    }

    /// Fields the source did not provide.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<MemField> {
        MemField::ALL
            .into_iter()
            .filter(|field| self.get(*field).is_none())
            .collect()
    }

    /// Whether all three fields were found.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// All three fields as raw kilobyte values keyed by output name.
    #[must_use]
    pub fn to_json(&self) -> Value {
        MemField::ALL
            .into_iter()
            .map(|field| (field.output_key().to_owned(), Value::from(self.raw_kb(field))))
            .collect::<Map<String, Value>>()
            .into()
    }
}

/// Skip to the first ASCII digit and read the run of digits starting there.
fn parse_number_after(rest: &str) -> Option<u64> {
    let start = rest.find(|c: char| c.is_ascii_digit())?;
    let digits = &rest[start..];
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().ok()
}
