//! Field rules for offices, catalog items and assets.
//!
//! Normalisers return the stored form of a value; validators return
//! `Err(message)` suitable for a 400 response.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static CATALOG_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{8}$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

/// Physical condition of an asset, stored as a one-letter code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = "N")]
    New,
    #[serde(rename = "B")]
    Good,
    #[serde(rename = "R")]
    Regular,
    #[serde(rename = "M")]
    Bad,
    #[serde(rename = "E")]
    ElectronicWaste,
    #[serde(rename = "C")]
    Scrap,
}

impl Condition {
    pub const ALL: [Condition; 6] = [
        Condition::New,
        Condition::Good,
        Condition::Regular,
        Condition::Bad,
        Condition::ElectronicWaste,
        Condition::Scrap,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Condition::New => "N",
            Condition::Good => "B",
            Condition::Regular => "R",
            Condition::Bad => "M",
            Condition::ElectronicWaste => "E",
            Condition::Scrap => "C",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Condition::New => "Nuevo",
            Condition::Good => "Bueno",
            Condition::Regular => "Regular",
            Condition::Bad => "Malo",
            Condition::ElectronicWaste => "RAEE",
            Condition::Scrap => "Chatarra",
        }
    }

    /// Parse a condition code. Lower-case input is accepted.
    pub fn parse(value: &str) -> Result<Self, String> {
        let upper = value.trim().to_uppercase();
        Condition::ALL
            .into_iter()
            .find(|c| c.code() == upper)
            .ok_or_else(|| {
                format!("Invalid condition '{value}'. Must be one of: N, B, R, M, E, C")
            })
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub const CATALOG_STATUS_ACTIVE: &str = "active";
pub const CATALOG_STATUS_EXCLUDED: &str = "excluded";

pub fn validate_catalog_status(status: &str) -> Result<(), String> {
    match status {
        CATALOG_STATUS_ACTIVE | CATALOG_STATUS_EXCLUDED => Ok(()),
        other => Err(format!(
            "Invalid catalog status '{other}'. Must be one of: active, excluded"
        )),
    }
}

/// Catalog codes are exactly eight digits.
pub fn validate_catalog_code(code: &str) -> Result<(), String> {
    if CATALOG_CODE_RE.is_match(code) {
        Ok(())
    } else {
        Err(format!("Catalog code '{code}' must be exactly 8 digits"))
    }
}

pub fn normalize_denomination(value: &str) -> String {
    value.trim().to_uppercase()
}

// ---------------------------------------------------------------------------
// Office
// ---------------------------------------------------------------------------

pub fn normalize_office_code(value: &str) -> String {
    value.trim().to_uppercase()
}

// ---------------------------------------------------------------------------
// Asset
// ---------------------------------------------------------------------------

pub fn normalize_plate(value: &str) -> String {
    value.trim().to_uppercase()
}

/// Generate the opaque scan code printed on an asset's label.
pub fn generate_qr_code() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Reject blank values for a required text field.
pub fn validate_required(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{field} must not be empty"))
    } else {
        Ok(())
    }
}
