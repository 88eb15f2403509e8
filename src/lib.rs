//! Parse `.env` files the way a POSIX shell binds them after `source`.
//!
//! Values follow shell quoting: single quotes are fully literal and may span
//! lines, double-quoted content is kept verbatim, and an unquoted `#` starts a
//! comment only when it follows whitespace.
//!
//! [`parse_str`] and [`load_dotenv`] are pure and return an ordered
//! [`EnvironmentMap`]. Loaders that write into the process environment
//! (`dotenv`, `from_path`) are `unsafe`, because callers must guarantee no
//! concurrent process-environment access.

mod env;
mod error;
mod loader;
mod model;
mod parser;
pub mod settings;

pub use env::TargetEnv;
pub use error::{Error, ParseError, ParseErrorKind};
pub use loader::{EnvLoader, dotenv, from_path, load_dotenv};
pub use model::{Entry, EnvironmentMap, KeyMode, LoadReport};
pub use parser::{
    parse_bytes, parse_bytes_with_mode, parse_reader, parse_reader_with_mode, parse_str,
    parse_str_with_mode,
};
pub use settings::Settings;
