//! Built-in module documentation, printed by `--manual`.

use std::fmt::Write;

use crate::meminfo::{MemField, PROC_MEMINFO_PATH};
use crate::units::Unit;

/// Render the module manual as plain text.
#[must_use]
pub fn render() -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    let _ = writeln!(out);
    let _ = writeln!(out, "Reports memory statistics from {}.", PROC_MEMINFO_PATH);
    let _ = writeln!(out, "Reads a JSON request on stdin and writes a JSON response to stdout.");
    let _ = writeln!(out);

    let _ = writeln!(out, "Options (\"opts\" or \"options\", at least one):");
    for field in MemField::ALL {
        let _ = writeln!(
            out,
            "  {:<8} {} (reported as \"{}\")",
            field.option_name(),
            field.description(),
            field.output_key()
        );
    }
    let _ = writeln!(out);

    let units = Unit::ALL.map(Unit::as_str).join(", ");
    let _ = writeln!(out, "Arguments (\"args\"):");
    let _ = writeln!(
        out,
        "  {:<8} Output unit, one of {} (default {}, case-insensitive)",
        "unit",
        units,
        Unit::default()
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Example:");
    let _ = writeln!(out, "  {{\"opts\": [\"free\", \"total\"], \"args\": {{\"unit\": \"mb\"}}}}");

    out
}
