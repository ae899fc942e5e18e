//! FLAT Common - Shared constants and utilities for the FLAT project store
//!
//! # Examples
//!
//! ```
//! use flat_common::{generate_id, is_valid_id, truncate_string, STORAGE_KEY};
//!
//! assert_eq!(STORAGE_KEY, "mockDb");
//! assert!(is_valid_id(&generate_id("project")));
//!
//! assert_eq!(truncate_string("hello world", 5), "he...");
//! ```

pub mod constants;
pub mod utils;

pub use constants::*;
pub use utils::*;
