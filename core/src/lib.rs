//! # sysmod-rs-core
//!
//! Core library for sysmod-rs modules providing the shared plumbing of the
//! orchestrator module protocol: a JSON request arrives on stdin, a single
//! JSON envelope leaves on stdout.
//!
//! ## Features
//!
//! - **Request decoding** - `opts`/`options` lists and free-form `args`
//! - **Response envelope** - `retcode`, `message` and `data` fields
//! - **Configuration management** - RON-based configuration with defaults
//! - **Logging** - `tracing` subscriber bound to stderr
//! - **Error handling** - Comprehensive error types with context
//!
//! ## Quick Start
//!
//! ```rust
//! use sysmod_rs_core::{ModuleRequest, ModuleResponse};
//!
//! let request = ModuleRequest::from_json(r#"{"opts": ["free"], "args": {"unit": "mb"}}"#)?;
//! assert_eq!(request.options(), ["free"]);
//! assert_eq!(request.arg_str("unit"), Some("mb"));
//!
//! let response = ModuleResponse::success("Data has been collected successfully")
//!     .with_data("unit", "mb");
//! assert_eq!(response.retcode, 0);
//! # Ok::<(), sysmod_rs_core::ModuleError>(())
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Decoded module request.
///
/// Only the fields a module consults are kept: the ordered list of requested
/// options and the `args` object. Everything else in the request document is
/// ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRequest {
    options: Vec<String>,
    args: Map<String, Value>,
}

impl ModuleRequest {
    /// Key holding the options list.
    pub const OPTIONS_KEY: &'static str = "opts";
    /// Accepted alias for [`Self::OPTIONS_KEY`].
    pub const OPTIONS_ALIAS: &'static str = "options";
    /// Key holding the arguments object.
    pub const ARGS_KEY: &'static str = "args";

    /// Decode a request from raw JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::Json`] if the input is not valid JSON, and the
    /// errors of [`Self::from_value`] otherwise.
    pub fn from_json(input: &str) -> Result<Self, ModuleError> {
        let doc: Value = serde_json::from_str(input)?;
        Self::from_value(doc)
    }

    /// Decode a request from an already parsed JSON document.
    ///
    /// `opts` wins over `options` when both are present. A non-object `args`
    /// is treated as absent.
    ///
    /// # Errors
    ///
    /// - [`ModuleError::MissingOptions`] if neither options key is present
    /// - [`ModuleError::EmptyOptions`] if the list has no entries
    /// - [`ModuleError::InvalidRequest`] if the options value is not a list
    /// - [`ModuleError::InvalidOption`] if a list entry is not a string
    pub fn from_value(doc: Value) -> Result<Self, ModuleError> {
        let Value::Object(mut doc) = doc else {
            return Err(ModuleError::MissingOptions);
        };

        let raw = doc
            .remove(Self::OPTIONS_KEY)
            .or_else(|| doc.remove(Self::OPTIONS_ALIAS))
            .ok_or(ModuleError::MissingOptions)?;

        let Value::Array(entries) = raw else {
            return Err(ModuleError::invalid_request("options must be a list"));
        };

        if entries.is_empty() {
            return Err(ModuleError::EmptyOptions);
        }

        let options = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match entry {
                Value::String(name) => Ok(name),
                other => Err(ModuleError::InvalidOption {
                    index,
                    value: other.to_string(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let args = match doc.remove(Self::ARGS_KEY) {
            Some(Value::Object(args)) => args,
            _ => Map::new(),
        };

        Ok(Self { options, args })
    }

    /// Requested options in request order.
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Look up a raw argument value.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    /// Look up a string argument. Non-string values are reported as absent.
    #[must_use]
    pub fn arg_str(&self, name: &str) -> Option<&str> {
        self.arg(name).and_then(Value::as_str)
    }
}

/// Response envelope written to stdout.
///
/// `data` always carries a `changed` flag. On failure every other key is
/// dropped.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModuleResponse {
    /// Status code, 0 on success
    pub retcode: i32,
    /// Human-readable status message
    pub message: String,
    /// Module payload
    pub data: Map<String, Value>,
}

impl ModuleResponse {
    /// Key of the change marker inside `data`.
    pub const CHANGED_KEY: &'static str = "changed";

    /// Create a successful response with `changed: true`.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        let mut data = Map::new();
        data.insert(Self::CHANGED_KEY.to_owned(), Value::Bool(true));
        Self {
            retcode: 0,
            message: message.into(),
            data,
        }
    }

    /// Add a data entry to this response.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_data(key, value);
        self
    }

    /// Set a data entry (mutable version).
    pub fn set_data(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Turn this response into a failure.
    ///
    /// Everything gathered so far is discarded; `data` keeps only
    /// `changed: false`.
    pub fn fail(&mut self, retcode: i32, message: impl Into<String>) {
        self.retcode = retcode;
        self.message = message.into();
        self.data.clear();
        self.data.insert(Self::CHANGED_KEY.to_owned(), Value::Bool(false));
    }

    /// Whether the response reports success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.retcode == 0
    }

    /// Serialize to a single-line JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ModuleError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Write the envelope followed by a newline.
    pub fn write_to<W: Write>(&self, mut out: W) -> Result<(), ModuleError> {
        writeln!(out, "{}", self.to_json()?)?;
        out.flush()?;
        Ok(())
    }
}

/// Global configuration loaded from ~/.config/sysmod-rs/config.ron
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GlobalConfig {
    /// Location of the memory statistics pseudo-file
    #[serde(default = "default_meminfo_path")]
    pub meminfo_path: PathBuf,
    /// Unit used when a request names none or an unknown one
    #[serde(default = "default_unit")]
    pub default_unit: String,
    /// Log filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            meminfo_path: default_meminfo_path(),
            default_unit: default_unit(),
            log_level: default_log_level(),
        }
    }
}

fn default_meminfo_path() -> PathBuf {
    PathBuf::from("/proc/meminfo")
}

fn default_unit() -> String {
    "kb".to_owned()
}

fn default_log_level() -> String {
    "warn".to_owned()
}

impl GlobalConfig {
    /// Load configuration from the standard config file location.
    ///
    /// Searches for config in:
    /// 1. ~/.config/sysmod-rs/config.ron
    /// 2. ~/.sysmod-rs/config.ron (fallback)
    ///
    /// Returns default config if no file is found.
    pub fn load() -> Result<Self, ModuleError> {
        if let Some(config_path) = Self::find_config_file() {
            Self::load_from_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ModuleError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    /// Parse configuration from RON text.
    pub fn from_ron_str(content: &str) -> Result<Self, ModuleError> {
        ron::from_str(content)
            .map_err(|e| ModuleError::config(format!("Failed to parse config file: {}", e)))
    }

    /// Find the config file in standard locations.
    pub fn find_config_file() -> Option<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_path = config_dir.join("sysmod-rs").join("config.ron");
            if xdg_path.exists() {
                return Some(xdg_path);
            }
        }

        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".sysmod-rs").join("config.ron");
            if home_path.exists() {
                return Some(home_path);
            }
        }

        None
    }
}

/// Logging setup shared by module binaries.
///
/// Stdout belongs to the response envelope, so every log line goes to stderr.
pub mod logging {
    use tracing_subscriber::EnvFilter;

    /// Install the global subscriber.
    ///
    /// `RUST_LOG` takes precedence over `default_directive`. Calling this more
    /// than once is harmless.
    pub fn init(default_directive: &str) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_level(true)
            .compact()
            .try_init();
    }
}

/// Common error types for module operations.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// I/O error while reading input or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The request (or an envelope) could not be (de)serialized.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Neither `opts` nor `options` was present.
    #[error("'options' not specified!")]
    MissingOptions,

    /// The options list was present but empty.
    #[error("'options' list is empty")]
    EmptyOptions,

    /// An options list entry was not a string.
    #[error("Option #{index} is not a string: {value}")]
    InvalidOption {
        /// Position in the options list
        index: usize,
        /// The offending JSON value
        value: String,
    },

    /// Structurally invalid request.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// What is wrong with the request
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration issue
        message: String,
    },

    /// Data source not available on this system.
    #[error("Source unavailable: {reason}")]
    Unavailable {
        /// Reason why the source is unavailable
        reason: String,
    },
}

impl ModuleError {
    /// Create a new invalid request error.
    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new unavailable error.
    pub fn unavailable<S: Into<String>>(reason: S) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}
