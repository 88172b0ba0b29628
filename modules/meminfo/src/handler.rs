//! Request handling for the meminfo module.
//!
//! Decodes the orchestrator request, takes one memory snapshot and builds the
//! response envelope holding only the requested fields.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use sysmod_rs_core::{GlobalConfig, ModuleError, ModuleRequest, ModuleResponse};

use crate::meminfo::{MemField, MemInfo, PROC_MEMINFO_PATH};
use crate::units::Unit;

/// Message of a successful response.
pub const SUCCESS_MESSAGE: &str = "Data has been collected successfully";

/// Request argument selecting the output unit.
pub const UNIT_ARG: &str = "unit";

/// Response data key echoing the resolved unit.
pub const UNIT_KEY: &str = "unit";

/// Runtime settings of the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// File the snapshot is read from
    pub source: PathBuf,
    /// Unit used when the request names none or an unknown one
    pub default_unit: Unit,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: PathBuf::from(PROC_MEMINFO_PATH),
            default_unit: Unit::default(),
        }
    }
}

impl Settings {
    /// Derive settings from the global configuration.
    ///
    /// An unknown `default_unit` falls back to kilobytes.
    #[must_use]
    pub fn from_config(config: &GlobalConfig) -> Self {
        Self {
            source: config.meminfo_path.clone(),
            default_unit: Unit::resolve(Some(&config.default_unit), Unit::Kb),
        }
    }

    /// Replace the source path.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = source.into();
        self
    }
}

/// What a one-shot CLI mode prints and how the process should exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Process exit code
    pub exit_code: i32,
    /// Text for stdout
    pub stdout: Option<String>,
    /// Text for stderr
    pub stderr: Option<String>,
}

impl Report {
    fn ok(stdout: String) -> Self {
        Self {
            exit_code: 0,
            stdout: Some(stdout),
            stderr: None,
        }
    }

    fn failed(stderr: String) -> Self {
        Self {
            exit_code: 1,
            stdout: None,
            stderr: Some(stderr),
        }
    }

    /// Print the report and return its exit code.
    pub fn emit(&self) -> i32 {
        if let Some(text) = &self.stdout {
            println!("{}", text);
        }
        if let Some(text) = &self.stderr {
            eprintln!("{}", text);
        }
        self.exit_code
    }
}

/// Read the source strictly, requiring every field.
///
/// # Errors
///
/// Returns [`ModuleError::Unavailable`] if the source cannot be read or lacks
/// any of the fields.
pub fn check_source(path: &Path) -> Result<MemInfo, ModuleError> {
    let info = MemInfo::probe(path)
        .map_err(|e| ModuleError::unavailable(format!("{}: {}", path.display(), e)))?;

    let missing = info.missing_fields();
    if !missing.is_empty() {
        let labels: Vec<&str> = missing.iter().map(|field| field.source_label()).collect();
        return Err(ModuleError::unavailable(format!(
            "{} is missing {}",
            path.display(),
            labels.join(" ")
        )));
    }

    Ok(info)
}

/// Availability check behind `--check`.
#[must_use]
pub fn check(settings: &Settings) -> Report {
    match check_source(&settings.source) {
        Ok(_) => Report::ok(format!(
            "Memory statistics are available at {}",
            settings.source.display()
        )),
        Err(e) => Report::failed(e.to_string()),
    }
}

/// Raw kilobyte dump behind `--dump`. Fails when `MemFree` is unknown.
///
/// # Errors
///
/// Returns [`ModuleError::Json`] if the dump cannot be serialized.
pub fn dump(settings: &Settings) -> Result<Report, ModuleError> {
    let info = MemInfo::from_path(&settings.source);
    let mut report = Report::ok(serde_json::to_string_pretty(&info.to_json())?);
    if info.get(MemField::Free).is_none() {
        report.exit_code = 1;
    }
    Ok(report)
}

/// Build the response for a decoded request against a snapshot.
///
/// Options are processed in order. The first unknown one turns the response
/// into a failure and stops processing; no field data survives it.
#[must_use]
pub fn handle(request: &ModuleRequest, info: &MemInfo, default_unit: Unit) -> ModuleResponse {
    let unit = Unit::resolve(request.arg_str(UNIT_ARG), default_unit);

    let mut response =
        ModuleResponse::success(SUCCESS_MESSAGE).with_data(UNIT_KEY, unit.as_str());

    for name in request.options() {
        match name.parse::<MemField>() {
            Ok(field) => response.set_data(field.output_key(), unit.to_json(info.raw_kb(field))),
            Err(e) => {
                tracing::debug!("Rejecting request: {}", e);
                response.fail(1, e.to_string());
                break;
            }
        }
    }

    response
}

/// Decode raw request text, read the configured source and build the response.
///
/// # Errors
///
/// Returns the request decoding errors of [`ModuleRequest::from_json`]. An
/// unreadable source is not an error.
pub fn handle_input(input: &str, settings: &Settings) -> Result<ModuleResponse, ModuleError> {
    let request = ModuleRequest::from_json(input)?;
    let info = MemInfo::from_path(&settings.source);
    tracing::debug!(?info, "Read memory snapshot from {}", settings.source.display());
    Ok(handle(&request, &info, settings.default_unit))
}

/// Run one request/response cycle over the given streams.
///
/// Nothing is written to `output` when the request cannot be decoded.
///
/// # Errors
///
/// Returns request decoding errors and I/O errors on either stream.
pub fn run<R: Read, W: Write>(
    mut input: R,
    output: W,
    settings: &Settings,
) -> Result<ModuleResponse, ModuleError> {
    let mut raw = String::new();
    input.read_to_string(&mut raw)?;

    let response = handle_input(&raw, settings)?;
    response.write_to(output)?;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn snapshot() -> MemInfo {
        MemInfo::parse("MemTotal: 2000 kB\nMemFree: 500 kB\nMemAvailable: 1048576 kB\n")
    }

    fn respond(input: &str) -> ModuleResponse {
        let request = ModuleRequest::from_json(input).unwrap();
        handle(&request, &snapshot(), Unit::Kb)
    }

    #[test]
    fn test_selected_fields_only() {
        let response = respond(r#"{"opts": ["free", "total"]}"#);

        assert_eq!(response.retcode, 0);
        assert_eq!(response.message, SUCCESS_MESSAGE);
        assert_eq!(
            Value::Object(response.data),
            json!({"changed": true, "unit": "kb", "mem-free": 500, "mem-total": 2000})
        );
    }

    #[test]
    fn test_unknown_option_stops_processing() {
        let response = respond(r#"{"opts": ["free", "bogus", "total"]}"#);

        assert_eq!(response.retcode, 1);
        assert!(response.message.contains("bogus"));
        assert_eq!(Value::Object(response.data), json!({"changed": false}));
    }

    #[test]
    fn test_first_unknown_option_wins() {
        let response = respond(r#"{"options": ["nope", "bogus"]}"#);
        assert_eq!(response.message, "Unknown option: nope");
    }

    #[test]
    fn test_unit_is_case_insensitive() {
        let response = respond(r#"{"opts": ["avail"], "args": {"unit": "GB"}}"#);

        assert_eq!(response.data["unit"], "gb");
        assert_eq!(response.data["mem-available"], 1.0);
    }

    #[test]
    fn test_invalid_unit_falls_back() {
        let response = respond(r#"{"opts": ["total"], "args": {"unit": "tb"}}"#);
        assert_eq!(response.retcode, 0);
        assert_eq!(response.data["unit"], "kb");
        assert_eq!(response.data["mem-total"], 2000);
    }

    #[test]
    fn test_missing_args_and_missing_unit_agree() {
        let without_args = respond(r#"{"opts": ["free"]}"#);
        let without_unit = respond(r#"{"opts": ["free"], "args": {}}"#);
        assert_eq!(without_args, without_unit);
    }

    #[test]
    fn test_bytes_and_megabytes() {
        let response = respond(r#"{"opts": ["free", "total"], "args": {"unit": "bt"}}"#);
        assert_eq!(response.data["mem-free"], 512_000);

        let response = respond(r#"{"opts": ["free"], "args": {"unit": "mb"}}"#);
        assert_eq!(response.data["mem-free"], 500.0 / 1024.0);
    }

    #[test]
    fn test_repeated_option() {
        let response = respond(r#"{"opts": ["free", "free"]}"#);
        assert_eq!(response.data.len(), 3);
    }

    #[test]
    fn test_unknown_fields_convert_sentinel() {
        let expected = [
            ("bt", json!(-1024)),
            ("kb", json!(-1)),
            ("mb", json!(-1.0 / 1024.0)),
            ("gb", json!(-1.0 / 1_048_576.0)),
        ];

        for (unit, value) in expected {
            let input = json!({"opts": ["free", "avail"], "args": {"unit": unit}});
            let request = ModuleRequest::from_value(input).unwrap();
            let response = handle(&request, &MemInfo::default(), Unit::Kb);

            assert_eq!(response.retcode, 0);
            assert_eq!(response.data["unit"], unit);
            assert_eq!(response.data["mem-free"], value);
            assert_eq!(response.data["mem-available"], value);
        }
    }

    #[test]
    fn test_default_unit_from_settings() {
        let request = ModuleRequest::from_json(r#"{"opts": ["total"]}"#).unwrap();
        let response = handle(&request, &snapshot(), Unit::Mb);
        assert_eq!(response.data["unit"], "mb");
    }

    #[test]
    fn test_run_writes_envelope() {
        let settings = Settings::default().with_source("/nonexistent/sysmod-rs/meminfo");
        let mut out = Vec::new();

        let response = run(r#"{"opts": ["total"]}"#.as_bytes(), &mut out, &settings).unwrap();

        let written: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(written, serde_json::to_value(&response).unwrap());
        assert_eq!(written["data"]["mem-total"], -1);
    }

    #[test]
    fn test_run_rejects_bad_json_silently() {
        let settings = Settings::default();
        let mut out = Vec::new();

        let err = run("{\"opts\": [".as_bytes(), &mut out, &settings).unwrap_err();
        assert!(matches!(err, ModuleError::Json(_)));
        assert!(out.is_empty());

        let err = run(r#"{"args": {}}"#.as_bytes(), &mut out, &settings).unwrap_err();
        assert!(matches!(err, ModuleError::MissingOptions));
        assert!(out.is_empty());
    }

    fn fixture(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "sysmod-rs-meminfo-{}-{}",
            std::process::id(),
            name
        ));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_check_complete_source() {
        let path = fixture(
            "check-ok",
            "MemTotal: 2000 kB\nMemFree: 500 kB\nMemAvailable: 900 kB\n",
        );
        let report = check(&Settings::default().with_source(&path));
        std::fs::remove_file(&path).unwrap();

        assert_eq!(report.exit_code, 0);
        assert!(report.stdout.unwrap().contains("available"));
        assert_eq!(report.stderr, None);
    }

    #[test]
    fn test_check_missing_source() {
        let report = check(&Settings::default().with_source("/nonexistent/sysmod-rs/meminfo"));
        assert_eq!(report.exit_code, 1);
        assert_eq!(report.stdout, None);
        assert!(report.stderr.unwrap().starts_with("Source unavailable"));

        assert!(matches!(
            check_source(Path::new("/nonexistent/sysmod-rs/meminfo")),
            Err(ModuleError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_check_incomplete_source() {
        let path = fixture("check-partial", "MemTotal: 2000 kB\nMemAvailable: 900 kB\n");
        let report = check(&Settings::default().with_source(&path));
        std::fs::remove_file(&path).unwrap();

        assert_eq!(report.exit_code, 1);
        assert!(report.stderr.unwrap().contains("MemFree:"));
    }

    #[test]
    fn test_dump_all_fields() {
        let path = fixture("dump-ok", "MemTotal: 2000 kB\nMemFree: 500 kB\n");
        let report = dump(&Settings::default().with_source(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(report.exit_code, 0);
        let printed: Value = serde_json::from_str(&report.stdout.unwrap()).unwrap();
        assert_eq!(
            printed,
            json!({"mem-free": 500, "mem-total": 2000, "mem-available": -1})
        );
    }

    #[test]
    fn test_dump_without_free_fails() {
        let path = fixture("dump-nofree", "MemTotal: 2000 kB\nMemAvailable: 900 kB\n");
        let report = dump(&Settings::default().with_source(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(report.exit_code, 1);
        let printed: Value = serde_json::from_str(&report.stdout.unwrap()).unwrap();
        assert_eq!(printed["mem-free"], -1);
        assert_eq!(printed["mem-total"], 2000);

        let settings = Settings::default().with_source("/nonexistent/sysmod-rs/meminfo");
        let report = dump(&settings).unwrap();
        assert_eq!(report.exit_code, 1);
    }

    #[test]
    fn test_settings_from_config() {
        let config = GlobalConfig {
            meminfo_path: PathBuf::from("/tmp/meminfo"),
            default_unit: "GB".to_owned(),
            ..GlobalConfig::default()
        };
        let settings = Settings::from_config(&config);
        assert_eq!(settings.source, PathBuf::from("/tmp/meminfo"));
        assert_eq!(settings.default_unit, Unit::Gb);

        let config = GlobalConfig {
            default_unit: "pages".to_owned(),
            ..GlobalConfig::default()
        };
        assert_eq!(Settings::from_config(&config).default_unit, Unit::Kb);
    }
}
