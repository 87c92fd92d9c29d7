//! Scheme normalization: mapping raw card-network exports to the
//! canonical transaction schema
//!
//! Each supported card network implements [`SchemeMapper`]. Format
//! resolution either honors an explicit directive or sniffs the
//! column namespace (`visa_` before `mc_`, fixed priority); input
//! nobody recognizes passes through best-effort rather than failing.

pub mod mastercard;
pub mod passthrough;
pub mod visa;

pub use mastercard::MastercardMapper;
pub use passthrough::PassthroughMapper;
pub use visa::VisaMapper;

use crate::types::Transaction;
use crate::utils::coerce;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One raw tabular record with scheme-specific column names
///
/// Column names are case-insensitive; values stay untyped strings until
/// a mapper coerces them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    columns: HashMap<String, String>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let mut row = Self::new();
        for (name, value) in pairs {
            row.insert(name, value);
        }
        row
    }

    pub fn insert(&mut self, column: &str, value: &str) {
        self.columns
            .insert(column.trim().to_lowercase(), value.to_string());
    }

    /// Raw value of a column, if present
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns.get(&column.trim().to_lowercase()).map(|s| s.as_str())
    }

    /// Trimmed value of a column, empty string when absent
    pub fn text(&self, column: &str) -> &str {
        self.get(column).map(str::trim).unwrap_or("")
    }

    /// First listed column that exists in the row
    pub fn first_text(&self, columns: &[&str]) -> Option<&str> {
        columns.iter().find_map(|c| self.get(c)).map(str::trim)
    }

    /// Monetary coercion of a column (absent/non-numeric is zero)
    pub fn amount(&self, column: &str) -> BigDecimal {
        coerce::to_amount(self.text(column))
    }

    /// Numeric coercion of a column (absent/non-numeric is zero)
    pub fn number(&self, column: &str) -> f64 {
        coerce::to_number(self.text(column))
    }

    /// Strict-boolean coercion of a flag-like column
    pub fn flag(&self, column: &str) -> bool {
        coerce::truthy(self.text(column))
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(&column.trim().to_lowercase())
    }

    /// Whether any column carries the given namespace prefix
    pub fn has_column_prefix(&self, prefix: &str) -> bool {
        self.columns.keys().any(|c| c.starts_with(prefix))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|s| s.as_str())
    }
}

impl From<HashMap<String, String>> for RawRow {
    fn from(columns: HashMap<String, String>) -> Self {
        let mut row = Self::new();
        for (name, value) in &columns {
            row.insert(name, value);
        }
        row
    }
}

/// Optional lookup table from 6-digit issuer BIN prefix to country code
///
/// Absence of the table degrades issuer country to unknown; it never
/// fails a run.
#[derive(Debug, Clone, Default)]
pub struct BinTable {
    entries: HashMap<String, String>,
}

impl BinTable {
    /// Empty table; every lookup misses
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_map(entries: HashMap<String, String>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(bin, country)| (bin.trim().to_string(), country.trim().to_uppercase()))
            .collect();
        Self { entries }
    }

    /// Load a JSON object of `{"bin6": "CC"}` entries
    ///
    /// A missing or unreadable file yields an empty table with a warning.
    pub fn from_path(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                log::warn!(
                    "BIN table {} not available ({err}); issuer countries will be unknown",
                    path.display()
                );
                return Self::empty();
            }
        };
        match serde_json::from_str::<HashMap<String, String>>(&raw) {
            Ok(entries) => Self::from_map(entries),
            Err(err) => {
                log::warn!(
                    "BIN table {} is malformed ({err}); issuer countries will be unknown",
                    path.display()
                );
                Self::empty()
            }
        }
    }

    /// Resolve an issuer BIN to a country code via its first six digits
    pub fn lookup(&self, issuer_bin: &str) -> Option<&str> {
        let bin = issuer_bin.trim();
        let prefix = bin.get(..6)?;
        self.entries.get(prefix).map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Mapping capability of one card network: raw row in, canonical row out
pub trait SchemeMapper: Send + Sync {
    /// Short scheme name for reporting ("visa", "mastercard", "raw")
    fn scheme(&self) -> &'static str;

    /// Whether this mapper recognizes the row's column namespace
    fn detect(&self, row: &RawRow) -> bool;

    /// Normalize one raw record into the canonical schema
    fn map_row(&self, row: &RawRow, bins: &BinTable) -> Transaction;

    /// Normalize a whole batch
    fn map_rows(&self, rows: &[RawRow], bins: &BinTable) -> Vec<Transaction> {
        rows.iter().map(|row| self.map_row(row, bins)).collect()
    }
}

/// Caller-supplied mapping directive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatDirective {
    /// Sniff the column namespace; Visa is checked before Mastercard
    #[default]
    Auto,
    Visa,
    Mastercard,
    /// Treat the input as already canonical
    Raw,
}

impl FormatDirective {
    /// Parse a directive string; unknown values warn and fall back to auto
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "" | "auto" => FormatDirective::Auto,
            "visa" => FormatDirective::Visa,
            "mastercard" | "mc" => FormatDirective::Mastercard,
            "raw" => FormatDirective::Raw,
            other => {
                log::warn!("unknown format directive '{other}', falling back to auto-detection");
                FormatDirective::Auto
            }
        }
    }
}

/// Resolve a directive and row set to a concrete mapper
///
/// Returns the mapper plus an unmapped-format flag: true when
/// auto-detection found no scheme namespace and the rows pass through
/// with best-effort canonical fields. The flag is reporting-only; an
/// unrecognized format is never an error.
pub fn resolve_mapper(
    directive: FormatDirective,
    rows: &[RawRow],
) -> (Box<dyn SchemeMapper>, bool) {
    match directive {
        FormatDirective::Visa => (Box::new(VisaMapper), false),
        FormatDirective::Mastercard => (Box::new(MastercardMapper), false),
        FormatDirective::Raw => (Box::new(PassthroughMapper), false),
        FormatDirective::Auto => {
            let sample = match rows.first() {
                Some(sample) => sample,
                None => return (Box::new(PassthroughMapper), false),
            };
            if VisaMapper.detect(sample) {
                (Box::new(VisaMapper), false)
            } else if MastercardMapper.detect(sample) {
                (Box::new(MastercardMapper), false)
            } else {
                log::warn!("no scheme namespace detected; rows pass through unmapped");
                (Box::new(PassthroughMapper), true)
            }
        }
    }
}
