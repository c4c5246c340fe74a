//! Input validation
//!
//! Checks run before any state changes. A rejected call leaves memory and
//! disk untouched.

use serde_json::Value;

use crate::error::{Result, ShelfError};

/// Marker that separates a table file name from its temp-file suffix
pub(crate) const TEMP_MARKER: &str = ".tmp.";

/// Device names Windows refuses to create as files, with or without extension
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Pre-check applied to every `(table, key, value)` before it reaches storage
pub trait Validator: Send + Sync {
    fn validate_table_name(&self, table: &str) -> Result<()>;
    fn validate_key(&self, key: &str) -> Result<()>;
    fn validate_value(&self, value: &Value) -> Result<()>;
}

/// Filesystem-safe defaults
#[derive(Debug, Clone)]
pub struct DefaultValidator {
    max_table_name_len: usize,
    max_key_len: usize,
}

impl DefaultValidator {
    pub fn new(max_table_name_len: usize, max_key_len: usize) -> Self {
        Self {
            max_table_name_len,
            max_key_len,
        }
    }
}

impl Default for DefaultValidator {
    fn default() -> Self {
        Self::new(255, 1024)
    }
}

fn invalid(msg: String) -> ShelfError {
    ShelfError::Validation(msg)
}

impl Validator for DefaultValidator {
    fn validate_table_name(&self, table: &str) -> Result<()> {
        if table.is_empty() {
            return Err(invalid("table name must not be empty".to_string()));
        }
        if table.len() > self.max_table_name_len {
            return Err(invalid(format!(
                "table name exceeds {} bytes",
                self.max_table_name_len
            )));
        }
        if table.contains('\0') {
            return Err(invalid("table name contains a null byte".to_string()));
        }
        if table.contains('/') || table.contains('\\') {
            return Err(invalid(format!("table name '{}' contains a path separator", table)));
        }
        if table.contains("..") {
            return Err(invalid(format!("table name '{}' contains '..'", table)));
        }
        if table.starts_with('.') {
            return Err(invalid(format!("table name '{}' starts with '.'", table)));
        }
        if table.contains(TEMP_MARKER) {
            return Err(invalid(format!(
                "table name '{}' contains reserved marker '{}'",
                table, TEMP_MARKER
            )));
        }

        let stem = table.split('.').next().unwrap_or(table);
        if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(stem)) {
            return Err(invalid(format!("table name '{}' is a reserved device name", table)));
        }

        Ok(())
    }

    fn validate_key(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(invalid("key must not be empty".to_string()));
        }
        if key.len() > self.max_key_len {
            return Err(invalid(format!("key exceeds {} bytes", self.max_key_len)));
        }
        if key.contains('\0') {
            return Err(invalid("key contains a null byte".to_string()));
        }
        Ok(())
    }

    fn validate_value(&self, value: &Value) -> Result<()> {
        // Typed inputs are rejected earlier, in `serde_json::to_value`.
        serde_json::to_vec(value)
            .map(|_| ())
            .map_err(|e| invalid(format!("value is not serializable: {}", e)))
    }
}
