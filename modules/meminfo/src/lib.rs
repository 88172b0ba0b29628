//! Memory statistics module for sysmod-rs.
//!
//! This crate reads `/proc/meminfo`, extracts the free, total and available
//! memory figures and answers orchestrator requests with a JSON envelope
//! holding the requested subset, optionally converted to another unit.
//!
//! # Examples
//!
//! ```rust
//! use sysmod_rs_core::ModuleRequest;
//! use sysmod_rs_meminfo::{handle, MemInfo, Unit};
//!
//! let info = MemInfo::parse("MemTotal: 2048 kB\nMemFree: 1024 kB\n");
//! let request = ModuleRequest::from_json(r#"{"opts": ["free"], "args": {"unit": "mb"}}"#)?;
//!
//! let response = handle(&request, &info, Unit::Kb);
//! assert_eq!(response.data["mem-free"], 1.0);
//! # Ok::<(), sysmod_rs_core::ModuleError>(())
//! ```

pub mod handler;
pub mod manual;
pub mod meminfo;
pub mod units;

pub use handler::{check, dump, handle, run, Report, Settings};
pub use meminfo::{MemField, MemInfo, UnknownFieldError};
pub use units::{Unit, UnitParseError};
