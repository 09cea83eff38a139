// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed Tally operations, one per supported job type.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tallylink_core::{AgentError, JobType};

use crate::types::{
    LedgerPayload, LedgerQuery, Report, ReportKind, ReportRequest, ReportRows, StockItemPayload,
    StockQuery, VoucherPayload, VoucherQuery,
};
use crate::{builder, parser};

/// A job decoded into the request it stands for.
///
/// Construction validates the payload, so a value of this type can always
/// be built into a request document apart from date normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum TallyOperation {
    CreateVoucher(VoucherPayload),
    ReadVouchers(VoucherQuery),
    CreateLedger(LedgerPayload),
    ReadLedgers(LedgerQuery),
    CreateStockItem(StockItemPayload),
    ReadStockItems(StockQuery),
    GenerateReport(ReportRequest),
}

fn decode<T: DeserializeOwned>(job_type: &JobType, payload: &Value) -> Result<T, AgentError> {
    T::deserialize(payload)
        .map_err(|e| AgentError::InvalidPayload(format!("{job_type}: {e}")))
}

/// Read queries accept a missing payload.
fn decode_query<T: DeserializeOwned + Default>(
    job_type: &JobType,
    payload: &Value,
) -> Result<T, AgentError> {
    if payload.is_null() {
        Ok(T::default())
    } else {
        decode(job_type, payload)
    }
}

fn require(job_type: &JobType, field: &str, value: &str) -> Result<(), AgentError> {
    if value.trim().is_empty() {
        Err(AgentError::InvalidPayload(format!(
            "{job_type}: `{field}` must not be empty"
        )))
    } else {
        Ok(())
    }
}

fn matches_ci(value: &str, wanted: Option<&str>) -> bool {
    wanted.is_none_or(|w| value.eq_ignore_ascii_case(w.trim()))
}

fn contains_ci(value: &str, wanted: Option<&str>) -> bool {
    wanted.is_none_or(|w| value.to_lowercase().contains(&w.trim().to_lowercase()))
}

impl TallyOperation {
    /// Decode a job's payload into an operation.
    ///
    /// Unsupported job types fail with [`AgentError::UnknownJobType`] and
    /// payloads of the wrong shape with [`AgentError::InvalidPayload`].
    pub fn from_job(job_type: &JobType, payload: &Value) -> Result<Self, AgentError> {
        let op = match job_type {
            JobType::VoucherCreate => {
                let p: VoucherPayload = decode(job_type, payload)?;
                require(job_type, "type", &p.voucher_type)?;
                require(job_type, "date", &p.date)?;
                Self::CreateVoucher(p)
            }
            JobType::VoucherRead => Self::ReadVouchers(decode_query(job_type, payload)?),
            JobType::LedgerCreate => {
                let p: LedgerPayload = decode(job_type, payload)?;
                require(job_type, "name", &p.name)?;
                Self::CreateLedger(p)
            }
            JobType::LedgerRead => Self::ReadLedgers(decode_query(job_type, payload)?),
            JobType::StockCreate => {
                let p: StockItemPayload = decode(job_type, payload)?;
                require(job_type, "name", &p.name)?;
                Self::CreateStockItem(p)
            }
            JobType::StockRead => Self::ReadStockItems(decode_query(job_type, payload)?),
            JobType::ReportGenerate => Self::GenerateReport(decode(job_type, payload)?),
            JobType::Unsupported(tag) => return Err(AgentError::UnknownJobType(tag.clone())),
        };
        Ok(op)
    }

    /// Render the request document.
    pub fn build(&self) -> Result<String, AgentError> {
        match self {
            Self::CreateVoucher(p) => builder::voucher(p),
            Self::ReadVouchers(q) => builder::voucher_list(q),
            Self::CreateLedger(p) => builder::ledger(p),
            Self::ReadLedgers(_) => builder::ledger_list(),
            Self::CreateStockItem(p) => builder::stock_item(p),
            Self::ReadStockItems(_) => builder::stock_item_list(),
            Self::GenerateReport(r) => builder::report(r),
        }
    }

    /// Decode the response into the JSON data reported to the cloud.
    pub fn parse(&self, response: &str) -> Result<Value, AgentError> {
        match self {
            Self::CreateVoucher(_) | Self::CreateLedger(_) | Self::CreateStockItem(_) => {
                to_json(parser::import_result(response)?)
            }
            Self::ReadVouchers(q) => {
                let mut list = parser::vouchers(response)?;
                list.retain(|v| matches_ci(&v.voucher_type, q.voucher_type.as_deref()));
                to_json(list)
            }
            Self::ReadLedgers(q) => {
                let mut list = parser::ledgers(response)?;
                list.retain(|l| {
                    matches_ci(&l.parent, q.group.as_deref())
                        && contains_ci(&l.name, q.name.as_deref())
                });
                to_json(list)
            }
            Self::ReadStockItems(q) => {
                let mut list = parser::stock_items(response)?;
                list.retain(|s| {
                    matches_ci(&s.parent, q.group.as_deref())
                        && contains_ci(&s.name, q.name.as_deref())
                });
                to_json(list)
            }
            Self::GenerateReport(r) => {
                let rows = match r.report_type {
                    ReportKind::TrialBalance => {
                        ReportRows::TrialBalance(parser::trial_balance(response)?)
                    }
                    ReportKind::StockSummary => {
                        ReportRows::StockSummary(parser::stock_summary(response)?)
                    }
                    ReportKind::DayBook
                    | ReportKind::SalesRegister
                    | ReportKind::PurchaseRegister => {
                        ReportRows::Vouchers(parser::vouchers(response)?)
                    }
                };
                to_json(Report {
                    report_type: r.report_type,
                    from_date: builder::tally_date(&r.from_date)?,
                    to_date: builder::tally_date(&r.to_date)?,
                    rows,
                })
            }
        }
    }

    pub fn job_type(&self) -> JobType {
        match self {
            Self::CreateVoucher(_) => JobType::VoucherCreate,
            Self::ReadVouchers(_) => JobType::VoucherRead,
            Self::CreateLedger(_) => JobType::LedgerCreate,
            Self::ReadLedgers(_) => JobType::LedgerRead,
            Self::CreateStockItem(_) => JobType::StockCreate,
            Self::ReadStockItems(_) => JobType::StockRead,
            Self::GenerateReport(_) => JobType::ReportGenerate,
        }
    }
}

fn to_json<T: serde::Serialize>(value: T) -> Result<Value, AgentError> {
    serde_json::to_value(value).map_err(|e| AgentError::Internal(format!("encode result: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LEDGERS: &str = r#"<ENVELOPE><BODY><DATA><COLLECTION>
        <LEDGER NAME="Cash"><PARENT>Cash-in-Hand</PARENT></LEDGER>
        <LEDGER NAME="Acme Traders"><PARENT>Sundry Debtors</PARENT></LEDGER>
        <LEDGER NAME="Beta Stores"><PARENT>Sundry Debtors</PARENT></LEDGER>
    </COLLECTION></DATA></BODY></ENVELOPE>"#;

    #[test]
    fn acme_ledger_create_round_trip() {
        let op = TallyOperation::from_job(
            &JobType::LedgerCreate,
            &json!({"name": "Acme & Co", "parent": "Sundry Debtors"}),
        )
        .unwrap();
        let doc = op.build().unwrap();
        assert!(doc.contains("<NAME>Acme &amp; Co</NAME>"));

        let response = "<ENVELOPE><BODY><IMPORTRESULT><CREATED>1</CREATED>\
                        <ERRORS>0</ERRORS><LASTMID>101</LASTMID></IMPORTRESULT></BODY></ENVELOPE>";
        assert_eq!(
            op.parse(response).unwrap(),
            json!({"created": true, "masterId": "101"})
        );
    }

    #[test]
    fn unsupported_type_is_unknown_job_type() {
        let err = TallyOperation::from_job(&JobType::Unsupported("payroll.run".into()), &json!({}))
            .unwrap_err();
        assert!(matches!(err, AgentError::UnknownJobType(ref t) if t == "payroll.run"));
    }

    #[test]
    fn create_requires_payload_shape() {
        let err = TallyOperation::from_job(&JobType::StockCreate, &Value::Null).unwrap_err();
        assert!(matches!(err, AgentError::InvalidPayload(_)));

        let err =
            TallyOperation::from_job(&JobType::LedgerCreate, &json!({"name": "  "})).unwrap_err();
        assert!(err.to_string().contains("`name` must not be empty"));

        let err = TallyOperation::from_job(&JobType::VoucherCreate, &json!({"type": "Sales"}))
            .unwrap_err();
        assert!(err.to_string().contains("date"));
    }

    #[test]
    fn reads_accept_missing_payload() {
        let op = TallyOperation::from_job(&JobType::LedgerRead, &Value::Null).unwrap();
        assert_eq!(op, TallyOperation::ReadLedgers(LedgerQuery::default()));
        let all = op.parse(LEDGERS).unwrap();
        assert_eq!(all.as_array().unwrap().len(), 3);
    }

    #[test]
    fn ledger_read_filters_by_group_and_name() {
        let op = TallyOperation::from_job(
            &JobType::LedgerRead,
            &json!({"group": "sundry debtors", "name": "acme"}),
        )
        .unwrap();
        let data = op.parse(LEDGERS).unwrap();
        assert_eq!(data, json!([{
            "name": "Acme Traders",
            "parent": "Sundry Debtors",
            "alias": "",
            "guid": ""
        }]));
    }

    #[test]
    fn voucher_read_filters_by_type() {
        let op = TallyOperation::from_job(
            &JobType::VoucherRead,
            &json!({"fromDate": "2026-04-01", "toDate": "2026-04-30", "voucherType": "sales"}),
        )
        .unwrap();
        let doc = op.build().unwrap();
        assert!(doc.contains("<SVFROMDATE>20260401</SVFROMDATE>"));

        let response = r#"<ENVELOPE><BODY><DATA><COLLECTION>
            <VOUCHER><VOUCHERTYPENAME>Sales</VOUCHERTYPENAME><AMOUNT>10</AMOUNT></VOUCHER>
            <VOUCHER><VOUCHERTYPENAME>Payment</VOUCHERTYPENAME><AMOUNT>5</AMOUNT></VOUCHER>
        </COLLECTION></DATA></BODY></ENVELOPE>"#;
        let data = op.parse(response).unwrap();
        assert_eq!(data.as_array().unwrap().len(), 1);
        assert_eq!(data[0]["voucherType"], "Sales");
    }

    #[test]
    fn stock_summary_report_shape() {
        let op = TallyOperation::from_job(
            &JobType::ReportGenerate,
            &json!({"reportType": "stock-summary", "fromDate": "2026-04-01", "toDate": "2026-04-30"}),
        )
        .unwrap();
        assert!(op.build().unwrap().contains("<ID>Stock Summary</ID>"));

        let response = r#"<ENVELOPE><BODY><DATA><COLLECTION>
            <STOCKITEM NAME="Widget"><CLOSINGBALANCE>12</CLOSINGBALANCE>
                <CLOSINGVALUE>1200</CLOSINGVALUE><BASEUNITS>Nos</BASEUNITS></STOCKITEM>
        </COLLECTION></DATA></BODY></ENVELOPE>"#;
        let data = op.parse(response).unwrap();
        assert_eq!(data["reportType"], "stock-summary");
        assert_eq!(data["fromDate"], "20260401");
        assert_eq!(data["rows"][0]["name"], "Widget");
        assert_eq!(data["rows"][0]["closingValue"], 1200.0);
        assert_eq!(data["rows"][0]["closingRate"], 0.0);
    }

    #[test]
    fn report_without_dates_is_invalid() {
        let err = TallyOperation::from_job(&JobType::ReportGenerate, &json!({"reportType": "day-book"}))
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidPayload(_)));
    }

    #[test]
    fn job_type_round_trips() {
        let op = TallyOperation::from_job(&JobType::StockRead, &Value::Null).unwrap();
        assert_eq!(op.job_type(), JobType::StockRead);
    }
}
