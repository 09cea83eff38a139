// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job payloads accepted by the Tally operations and the records decoded
//! from Tally responses.
//!
//! Payloads use the cloud's camelCase field names. Decoded records are
//! serialized back to the cloud in the same style.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

// --- Write payloads ---

/// `voucher.create` payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherPayload {
    /// Voucher type name, e.g. `Sales` or `Payment`.
    #[serde(rename = "type")]
    pub voucher_type: String,
    pub date: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub voucher_number: Option<String>,
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub narration: Option<String>,
    #[serde(default)]
    pub ledgers: Vec<LedgerLine>,
    #[serde(default)]
    pub items: Vec<InventoryLine>,
}

/// One accounting line of a voucher.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LedgerLine {
    pub name: String,
    pub amount: f64,
}

/// One inventory line of a voucher.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InventoryLine {
    pub name: String,
    pub quantity: f64,
    #[serde(default)]
    pub rate: f64,
    #[serde(default)]
    pub amount: f64,
    /// Unit of measure; `Nos` when absent.
    #[serde(default)]
    pub unit: Option<String>,
}

/// `ledger.create` payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerPayload {
    pub name: String,
    #[serde(default = "default_ledger_parent")]
    pub parent: String,
    #[serde(default)]
    pub opening_balance: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub pincode: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub gstin: Option<String>,
}

fn default_ledger_parent() -> String {
    "Sundry Debtors".to_string()
}

/// `stock.create` payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockItemPayload {
    pub name: String,
    #[serde(default = "default_stock_parent")]
    pub parent: String,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub opening_balance: Option<f64>,
    #[serde(default)]
    pub opening_rate: Option<f64>,
    #[serde(default)]
    pub opening_value: Option<f64>,
    #[serde(default)]
    pub gst_rate: Option<f64>,
}

fn default_stock_parent() -> String {
    "Primary".to_string()
}

pub(crate) fn default_unit() -> String {
    "Nos".to_string()
}

// --- Read payloads ---

/// `voucher.read` payload. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VoucherQuery {
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    /// Keep only vouchers of this type (case-insensitive).
    pub voucher_type: Option<String>,
}

/// `ledger.read` payload; filters are applied to the decoded list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LedgerQuery {
    /// Keep only ledgers under this parent group (case-insensitive).
    pub group: Option<String>,
    /// Keep only ledgers whose name contains this text (case-insensitive).
    pub name: Option<String>,
}

/// `stock.read` payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StockQuery {
    pub group: Option<String>,
    pub name: Option<String>,
}

/// `report.generate` payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    #[serde(default, deserialize_with = "report_kind")]
    pub report_type: ReportKind,
    pub from_date: String,
    pub to_date: String,
}

/// Reports the agent knows how to request and decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ReportKind {
    #[default]
    DayBook,
    SalesRegister,
    PurchaseRegister,
    StockSummary,
    TrialBalance,
}

impl ReportKind {
    /// Tally's report id for the export header.
    pub fn report_id(self) -> &'static str {
        match self {
            Self::DayBook => "Day Book",
            Self::SalesRegister => "Sales Register",
            Self::PurchaseRegister => "Purchase Register",
            Self::StockSummary => "Stock Summary",
            Self::TrialBalance => "Trial Balance",
        }
    }

    /// Unrecognized names fall back to the Day Book.
    pub fn from_tag(tag: &str) -> Self {
        tag.parse().unwrap_or_default()
    }
}

fn report_kind<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ReportKind, D::Error> {
    let tag = Option::<String>::deserialize(deserializer)?;
    Ok(tag.as_deref().map(ReportKind::from_tag).unwrap_or_default())
}

/// Accept text fields the cloud sometimes sends as numbers (pincodes, phone
/// numbers, voucher numbers).
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected text or number, found {other}"
        ))),
    }
}

// --- Decoded results ---

/// Outcome of an import (create) request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub created: bool,
    pub master_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voucher_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    pub name: String,
    pub parent: String,
    pub alias: String,
    pub guid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockItemRecord {
    pub name: String,
    pub parent: String,
    pub alias: String,
    pub base_unit: String,
    pub guid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherRecord {
    pub date: String,
    pub voucher_type: String,
    pub voucher_number: String,
    pub party: String,
    pub amount: f64,
    pub narration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialBalanceRow {
    pub name: String,
    pub parent: String,
    pub opening_balance: f64,
    pub closing_balance: f64,
    pub debit: f64,
    pub credit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSummaryRow {
    pub name: String,
    pub closing_balance: f64,
    pub closing_value: f64,
    pub closing_rate: f64,
    pub unit: String,
}

/// Rows of a generated report, shaped by the report kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportRows {
    Vouchers(Vec<VoucherRecord>),
    TrialBalance(Vec<TrialBalanceRow>),
    StockSummary(Vec<StockSummaryRow>),
}

/// Data returned for `report.generate`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub report_type: ReportKind,
    pub from_date: String,
    pub to_date: String,
    pub rows: ReportRows,
}

/// Application edition, classified from the system info response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Edition {
    Prime,
    PrimeServer,
    /// Fallback when no marker is found.
    #[strum(serialize = "ERP9")]
    Erp9,
}

impl Edition {
    /// Best-effort classification by product markers in the response text.
    pub fn classify(response: &str) -> Self {
        if response.contains("TallyPrime") {
            Self::Prime
        } else if response.contains("TallyServer") {
            Self::PrimeServer
        } else {
            Self::Erp9
        }
    }
}
