//! Core types and data structures for the compliance pipeline

use bigdecimal::BigDecimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// ISO country codes of the 27 EU member states
pub const EU_COUNTRIES: [&str; 27] = [
    "AT", "BE", "BG", "HR", "CY", "CZ", "DK", "EE", "FI", "FR", "DE", "GR", "HU", "IE", "IT",
    "LV", "LT", "LU", "MT", "NL", "PL", "PT", "RO", "SK", "SI", "ES", "SE",
];

/// Geographic region used by the scheme rules
///
/// UK and US are standalone singleton regions; everything outside
/// EU/UK/US falls into rest-of-world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    /// European Union member state
    Eu,
    /// United Kingdom (GB)
    Uk,
    /// United States
    Us,
    /// Rest of world (including unknown/empty country codes)
    #[default]
    Row,
}

impl Region {
    /// Classify an ISO country code into a region
    ///
    /// Empty or unrecognized codes classify as rest-of-world.
    pub fn from_country(country_code: &str) -> Self {
        let cc = country_code.trim().to_uppercase();
        if cc.is_empty() {
            return Region::Row;
        }
        match cc.as_str() {
            "GB" => Region::Uk,
            "US" => Region::Us,
            _ if EU_COUNTRIES.contains(&cc.as_str()) => Region::Eu,
            _ => Region::Row,
        }
    }

    /// Whether this region is in scope for EU/UK regulatory requirements
    pub fn is_eu_uk(&self) -> bool {
        matches!(self, Region::Eu | Region::Uk)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Eu => "EU",
            Region::Uk => "UK",
            Region::Us => "US",
            Region::Row => "ROW",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction channel classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Channel {
    /// Card-present point of sale
    #[default]
    Pos,
    /// E-commerce (card not present)
    Ecom,
    /// Mail order / telephone order; only arises from already-canonical
    /// input, scheme mappers signal MOTO through the indicator flag
    Moto,
}

impl Channel {
    /// Parse an already-canonical channel value; anything unrecognized is POS
    pub fn from_canonical(text: &str) -> Self {
        match text.trim().to_uppercase().as_str() {
            "ECOM" => Channel::Ecom,
            "MOTO" => Channel::Moto,
            _ => Channel::Pos,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Pos => "POS",
            Channel::Ecom => "ECOM",
            Channel::Moto => "MOTO",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a compliance rule, totally ordered LOW < MEDIUM < HIGH < CRITICAL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Numeric rank used for cutoff comparisons: LOW=1 .. CRITICAL=4
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }

    /// Parse a severity name; unrecognized names default to MEDIUM
    pub fn parse_or_default(name: &str) -> Self {
        match name.trim().to_uppercase().as_str() {
            "LOW" => Severity::Low,
            "MEDIUM" => Severity::Medium,
            "HIGH" => Severity::High,
            "CRITICAL" => Severity::Critical,
            _ => Severity::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// Lenient on purpose: rule files come from operators, and an unknown
// severity name must degrade to MEDIUM rather than fail the load.
impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Severity::parse_or_default(&name))
    }
}

/// Display-level risk classification for one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Worst severity across a transaction's findings, with escalation:
    /// three or more MEDIUM findings and nothing above MEDIUM count as HIGH.
    pub fn from_findings(findings: &[Finding]) -> Self {
        if findings.is_empty() {
            return RiskLevel::None;
        }
        let max_rank = findings
            .iter()
            .map(|f| f.severity.rank())
            .max()
            .unwrap_or(0);
        let medium_count = findings
            .iter()
            .filter(|f| f.severity == Severity::Medium)
            .count();
        let rank = if medium_count >= 3 && max_rank < Severity::High.rank() {
            Severity::High.rank()
        } else {
            max_rank
        };
        match rank {
            1 => RiskLevel::Low,
            2 => RiskLevel::Medium,
            3 => RiskLevel::High,
            4 => RiskLevel::Critical,
            _ => RiskLevel::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "NONE",
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication strength encoded by the ECI / 3-D Secure indicator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EciStrength {
    /// Fully authenticated (Visa ECI 05, Mastercard ECI 02)
    Strong,
    /// Authentication attempted (Visa ECI 06, Mastercard ECI 01)
    Attempt,
    /// No authentication, or an unrecognized indicator
    #[default]
    None,
}

impl EciStrength {
    /// Map a scheme ECI code to an authentication strength
    ///
    /// The accepted code sets are closed; anything outside them is NONE.
    pub fn from_code(eci: &str) -> Self {
        const STRONG: [&str; 7] = ["ECOM_5", "ECI5", "5", "05", "ECI2", "2", "02"];
        const ATTEMPT: [&str; 7] = ["ECOM_6", "ECI6", "6", "06", "ECI1", "1", "01"];
        let code = eci.trim().to_uppercase();
        if STRONG.contains(&code.as_str()) {
            EciStrength::Strong
        } else if ATTEMPT.contains(&code.as_str()) {
            EciStrength::Attempt
        } else {
            EciStrength::None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EciStrength::Strong => "STRONG",
            EciStrength::Attempt => "ATTEMPT",
            EciStrength::None => "NONE",
        }
    }
}

impl fmt::Display for EciStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical transaction row produced by a scheme mapper
///
/// Immutable once mapped except for `sca_required`, which the fact
/// deriver resolves when the mapper leaves it unset. Lifetime is one
/// pipeline run; nothing here is persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Scheme transaction identifier (ARN / retrieval reference number)
    pub transaction_id: String,
    /// Card brand ("Visa", "Mastercard", or empty for raw input)
    pub brand: String,
    /// Card acceptor identifier
    pub merchant_id: String,
    pub merchant_name: String,
    /// ISO country code of the merchant
    pub merchant_country: String,
    pub merchant_region: Region,
    /// Issuer country resolved from the BIN table; `None` when unknown
    pub card_country: Option<String>,
    /// Transaction amount; non-numeric input coerces to zero
    pub amount: BigDecimal,
    pub currency: String,
    pub settlement_amount: BigDecimal,
    pub settlement_currency: String,
    pub channel: Channel,
    pub pos_entry_mode: String,
    /// Whether the AVS result code indicates address verification was used
    pub avs_used: bool,
    /// Normalized ECI / 3-D Secure indicator ("NA" when absent)
    pub eci: String,
    pub sca_applied: bool,
    /// Left `None` by the mappers; the fact deriver fills it in
    pub sca_required: Option<bool>,
    /// Product class text; a "commercial" prefix classifies as commercial
    pub product: String,
    pub enhanced_fields_present: bool,
    pub enhanced_validated: bool,
    /// Hours between authorization and presentment (0 when unknown)
    pub settlement_delay_hours: f64,
    pub moto_indicator: bool,
    pub mit_indicator: bool,
    pub mit_expected: bool,
    /// Cross-border flag as supplied by the input feed
    pub cross_border: bool,
}

/// One compliance rule matching one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub rule_id: String,
    pub title: String,
    pub severity: Severity,
    pub message: String,
    pub remediation: String,
    /// Basis-point cost hint carried from the rule definition
    pub impact_hint_bps: f64,
    /// Fixed per-item fee hint carried from the rule definition
    pub impact_hint_per_item: BigDecimal,
}

/// Errors raised on the configuration loading path
///
/// Evaluation itself is total: bad data degrades facts instead of failing.
#[derive(Debug, thiserror::Error)]
pub enum ComplianceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Rule '{rule_id}' has an invalid predicate: {reason}")]
    Predicate { rule_id: String, reason: String },
}

/// Result type for configuration operations
pub type ComplianceResult<T> = Result<T, ComplianceError>;
