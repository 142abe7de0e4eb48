//! Core types for upsbridge.
//!
//! This crate holds the protocol-independent half of a polling round:
//! - **Report**: ordered status fields and their typed values
//! - **parser**: `NAME: value` line tokenizer
//! - **normalize**: timestamp, duration and derived power rules
//! - **error**: the error taxonomy shared by every stage

pub mod config;
pub mod error;
pub mod normalize;
pub mod parser;
pub mod report;

pub use error::{Error, Result};
pub use normalize::{normalize, NormalizeOptions, CURRENT_POWER_FIELD};
pub use parser::{parse_line, parse_lines};
pub use report::{FieldValue, Magnitude, Measurement, Report, Unit};
