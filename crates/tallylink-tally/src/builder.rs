// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request document construction.
//!
//! Builders are pure functions from payloads to XML text, written with
//! quick-xml. Payload text is trimmed of surrounding whitespace and escaped;
//! interior whitespace and non-ASCII text are kept as given. Optional fields
//! that are absent, blank, or zero produce no element at all.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use tallylink_core::AgentError;

use crate::types::{
    InventoryLine, LedgerLine, LedgerPayload, ReportRequest, StockItemPayload, VoucherPayload,
    VoucherQuery, default_unit,
};

pub use quick_xml::escape::escape;

/// Minimal document used as a liveness probe.
pub const PING_DOCUMENT: &str = "<ENVELOPE></ENVELOPE>";

/// Escaped element text. Carriage returns become character references so
/// `\r\n` survives parsing unchanged.
fn escape_text(text: &str) -> Cow<'_, str> {
    let escaped = escape(text);
    if escaped.contains('\r') {
        Cow::Owned(escaped.replace('\r', "&#13;"))
    } else {
        escaped
    }
}

/// Escaped attribute value. Tabs and line breaks become character references,
/// otherwise a conforming parser normalizes them to spaces.
fn escape_attr(value: &str) -> Cow<'_, str> {
    let escaped = escape(value);
    if escaped.contains(['\t', '\n', '\r']) {
        Cow::Owned(
            escaped
                .replace('\t', "&#9;")
                .replace('\n', "&#10;")
                .replace('\r', "&#13;"),
        )
    } else {
        escaped
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y", "%d-%b-%Y"];

/// Normalize a date to Tally's `YYYYMMDD`.
///
/// Accepts plain dates in the common layouts as well as RFC 3339 and naive
/// ISO timestamps; a timestamp contributes its own calendar date.
pub fn tally_date(input: &str) -> Result<String, AgentError> {
    let input = input.trim();
    let date = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(input)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
        .ok_or_else(|| AgentError::InvalidPayload(format!("unrecognized date `{input}`")))?;
    Ok(date.format("%Y%m%d").to_string())
}

/// Indented document writer over [`quick_xml::Writer`]. The first write
/// error is kept and returned by [`finish`](Self::finish).
struct XmlWriter {
    inner: Writer<Vec<u8>>,
    error: Option<String>,
}

impl XmlWriter {
    fn new() -> Self {
        Self {
            inner: Writer::new_with_indent(Vec::with_capacity(1024), b' ', 2),
            error: None,
        }
    }

    fn emit(&mut self, event: Event<'_>) -> &mut Self {
        if self.error.is_none()
            && let Err(e) = self.inner.write_event(event)
        {
            self.error = Some(e.to_string());
        }
        self
    }

    fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> &mut Self {
        let mut start = BytesStart::new(name);
        for (key, value) in attrs {
            let value = escape_attr(value.trim());
            start.push_attribute((key.as_bytes(), value.as_bytes()));
        }
        self.emit(Event::Start(start))
    }

    fn close(&mut self, name: &str) -> &mut Self {
        self.emit(Event::End(BytesEnd::new(name)))
    }

    fn leaf(&mut self, name: &str, text: &str) -> &mut Self {
        self.open(name, &[]);
        self.emit(Event::Text(BytesText::from_escaped(escape_text(text.trim()))));
        self.close(name)
    }

    fn opt_leaf(&mut self, name: &str, text: Option<&str>) -> &mut Self {
        match text.map(str::trim) {
            Some(t) if !t.is_empty() => self.leaf(name, t),
            _ => self,
        }
    }

    fn opt_number(&mut self, name: &str, value: Option<f64>) -> &mut Self {
        match value {
            Some(v) if v != 0.0 => self.leaf(name, &v.to_string()),
            _ => self,
        }
    }

    fn finish(self) -> Result<String, AgentError> {
        if let Some(e) = self.error {
            return Err(AgentError::Internal(format!("failed to write document: {e}")));
        }
        String::from_utf8(self.inner.into_inner())
            .map_err(|e| AgentError::Internal(format!("document is not UTF-8: {e}")))
    }
}

/// Wrap an import body: `Import Data` request against `report` (e.g. `Vouchers`).
fn import_document(
    report: &str,
    body: impl FnOnce(&mut XmlWriter),
) -> Result<String, AgentError> {
    let mut w = XmlWriter::new();
    w.open("ENVELOPE", &[])
        .open("HEADER", &[])
        .leaf("TALLYREQUEST", "Import Data")
        .close("HEADER")
        .open("BODY", &[])
        .open("IMPORTDATA", &[])
        .open("REQUESTDESC", &[])
        .leaf("REPORTNAME", report)
        .close("REQUESTDESC")
        .open("REQUESTDATA", &[])
        .open("TALLYMESSAGE", &[("xmlns:UDF", "TallyUDF")]);
    body(&mut w);
    w.close("TALLYMESSAGE")
        .close("REQUESTDATA")
        .close("IMPORTDATA")
        .close("BODY")
        .close("ENVELOPE");
    w.finish()
}

/// An `Export` request of `kind` (`Collection` or `Data`) for `id`.
fn export_document(
    kind: &str,
    id: &str,
    variables: &[(&str, &str)],
) -> Result<String, AgentError> {
    let mut w = XmlWriter::new();
    w.open("ENVELOPE", &[])
        .open("HEADER", &[])
        .leaf("VERSION", "1")
        .leaf("TALLYREQUEST", "Export")
        .leaf("TYPE", kind)
        .leaf("ID", id)
        .close("HEADER")
        .open("BODY", &[])
        .open("DESC", &[])
        .open("STATICVARIABLES", &[])
        .leaf("SVEXPORTFORMAT", "$$SysName:XML");
    for (name, value) in variables {
        w.leaf(name, value);
    }
    w.close("STATICVARIABLES")
        .close("DESC")
        .close("BODY")
        .close("ENVELOPE");
    w.finish()
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

fn ledger_line(w: &mut XmlWriter, line: &LedgerLine) {
    // Debit lines carry negative amounts and are the "deemed positive" side.
    w.open("ALLLEDGERENTRIES.LIST", &[])
        .leaf("LEDGERNAME", &line.name)
        .leaf("ISDEEMEDPOSITIVE", yes_no(line.amount < 0.0))
        .leaf("AMOUNT", &line.amount.to_string())
        .close("ALLLEDGERENTRIES.LIST");
}

fn inventory_line(w: &mut XmlWriter, line: &InventoryLine) {
    let unit = line
        .unit
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .map_or_else(default_unit, str::to_string);
    let qty = format!("{} {unit}", line.quantity);
    // Inventory polarity is the reverse of ledger lines: outward stock is positive.
    w.open("ALLINVENTORYENTRIES.LIST", &[])
        .leaf("STOCKITEMNAME", &line.name)
        .leaf("ISDEEMEDPOSITIVE", yes_no(line.quantity >= 0.0))
        .leaf("RATE", &line.rate.to_string())
        .leaf("AMOUNT", &line.amount.to_string())
        .leaf("ACTUALQTY", &qty)
        .leaf("BILLEDQTY", &qty)
        .close("ALLINVENTORYENTRIES.LIST");
}

/// `Import Data` into `Vouchers` creating one voucher.
pub fn voucher(payload: &VoucherPayload) -> Result<String, AgentError> {
    let date = tally_date(&payload.date)?;
    let vch_type = payload.voucher_type.as_str();
    import_document("Vouchers", |w| {
        w.open(
            "VOUCHER",
            &[
                ("VCHTYPE", vch_type),
                ("ACTION", "Create"),
                ("OBJVIEW", "Invoice Voucher View"),
            ],
        )
        .leaf("DATE", &date)
        .leaf("VOUCHERTYPENAME", vch_type)
        .opt_leaf("VOUCHERNUMBER", payload.voucher_number.as_deref())
        .opt_leaf("PARTYLEDGERNAME", payload.party.as_deref())
        .opt_leaf("NARRATION", payload.narration.as_deref());
        for line in &payload.ledgers {
            ledger_line(w, line);
        }
        for line in &payload.items {
            inventory_line(w, line);
        }
        w.close("VOUCHER");
    })
}

/// `Import Data` into `All Masters` creating one ledger.
pub fn ledger(payload: &LedgerPayload) -> Result<String, AgentError> {
    import_document("All Masters", |w| {
        w.open("LEDGER", &[("NAME", payload.name.as_str()), ("ACTION", "Create")])
            .leaf("NAME", &payload.name)
            .leaf("PARENT", &payload.parent)
            .opt_number("OPENINGBALANCE", payload.opening_balance)
            .opt_leaf("ADDRESS", payload.address.as_deref())
            .opt_leaf("CITY", payload.city.as_deref())
            .opt_leaf("STATE", payload.state.as_deref())
            .opt_leaf("PINCODE", payload.pincode.as_deref())
            .opt_leaf("PHONE", payload.phone.as_deref())
            .opt_leaf("EMAIL", payload.email.as_deref())
            .opt_leaf("PARTYGSTIN", payload.gstin.as_deref())
            .close("LEDGER");
    })
}

/// `Import Data` into `All Masters` creating one stock item.
pub fn stock_item(payload: &StockItemPayload) -> Result<String, AgentError> {
    import_document("All Masters", |w| {
        w.open("STOCKITEM", &[("NAME", payload.name.as_str()), ("ACTION", "Create")])
            .leaf("NAME", &payload.name)
            .leaf("PARENT", &payload.parent)
            .leaf("BASEUNITS", &payload.unit)
            .opt_number("OPENINGBALANCE", payload.opening_balance)
            .opt_number("OPENINGRATE", payload.opening_rate)
            .opt_number("OPENINGVALUE", payload.opening_value)
            .opt_number("GSTRATE", payload.gst_rate)
            .close("STOCKITEM");
    })
}

pub fn ledger_list() -> Result<String, AgentError> {
    export_document("Collection", "List of Ledgers", &[])
}

pub fn stock_item_list() -> Result<String, AgentError> {
    export_document("Collection", "List of Stock Items", &[])
}

/// Day Book export over an optional date range.
pub fn voucher_list(query: &VoucherQuery) -> Result<String, AgentError> {
    let from = query.from_date.as_deref().map(tally_date).transpose()?;
    let to = query.to_date.as_deref().map(tally_date).transpose()?;
    let mut vars = Vec::new();
    if let Some(from) = from.as_deref() {
        vars.push(("SVFROMDATE", from));
    }
    if let Some(to) = to.as_deref() {
        vars.push(("SVTODATE", to));
    }
    export_document("Data", "Day Book", &vars)
}

pub fn report(request: &ReportRequest) -> Result<String, AgentError> {
    let from = tally_date(&request.from_date)?;
    let to = tally_date(&request.to_date)?;
    export_document(
        "Data",
        request.report_type.report_id(),
        &[("SVFROMDATE", from.as_str()), ("SVTODATE", to.as_str())],
    )
}

/// System information export; the response text identifies the edition.
pub fn system_info() -> Result<String, AgentError> {
    export_document("Data", "SysInfo", &[("SVCURRENTCOMPANY", "##SYSNAME")])
}

/// Company information export for the currently loaded company.
pub fn company_info() -> Result<String, AgentError> {
    export_document("Data", "CompanyInfo", &[("SVCURRENTCOMPANY", "##SYSNAME")])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::XmlNode;
    use crate::types::ReportKind;
    use proptest::prelude::*;
    use serde_json::json;

    fn ledger_payload(value: serde_json::Value) -> LedgerPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn escapes_all_metacharacters() {
        assert_eq!(escape(r#"a&b<c>d"e'f"#), "a&amp;b&lt;c&gt;d&quot;e&apos;f");
        assert!(matches!(escape("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn ledger_name_is_escaped() {
        let doc = ledger(&ledger_payload(json!({
            "name": "Acme & Co",
            "parent": "Sundry Debtors"
        })))
        .unwrap();
        assert!(doc.contains("<NAME>Acme &amp; Co</NAME>"));
        assert!(doc.contains(r#"<LEDGER NAME="Acme &amp; Co" ACTION="Create">"#));
        assert!(doc.contains("<PARENT>Sundry Debtors</PARENT>"));
        assert!(doc.contains("<REPORTNAME>All Masters</REPORTNAME>"));
    }

    #[test]
    fn absent_and_falsy_fields_are_omitted() {
        let doc = ledger(&ledger_payload(json!({
            "name": "Acme",
            "openingBalance": 0,
            "city": "",
            "email": "ap@acme.test"
        })))
        .unwrap();
        assert!(!doc.contains("OPENINGBALANCE"));
        assert!(!doc.contains("<CITY>"));
        assert!(!doc.contains("<ADDRESS>"));
        assert!(doc.contains("<EMAIL>ap@acme.test</EMAIL>"));
    }

    #[test]
    fn dates_normalize_from_common_layouts() {
        for input in [
            "2026-04-01",
            "20260401",
            "2026/04/01",
            "01-04-2026",
            "01/04/2026",
            "1-Apr-2026",
            "2026-04-01T10:30:00Z",
            "2026-04-01T10:30:00.250",
        ] {
            assert_eq!(tally_date(input).unwrap(), "20260401", "{input}");
        }
        assert!(matches!(
            tally_date("next tuesday"),
            Err(AgentError::InvalidPayload(_))
        ));
    }

    #[test]
    fn deemed_positive_polarity_differs_by_line_kind() {
        let payload: VoucherPayload = serde_json::from_value(json!({
            "type": "Sales",
            "date": "2026-04-01",
            "voucherNumber": 42,
            "party": "Acme",
            "ledgers": [
                {"name": "Acme", "amount": -1180},
                {"name": "Sales", "amount": 1000}
            ],
            "items": [
                {"name": "Widget", "quantity": 10, "rate": 100, "amount": 1000},
                {"name": "Return", "quantity": -1, "rate": 100, "amount": -100, "unit": "Box"}
            ]
        }))
        .unwrap();
        let doc = voucher(&payload).unwrap();
        let root = XmlNode::parse(&doc).unwrap();
        let voucher = root.find("VOUCHER").unwrap();

        let ledgers: Vec<_> = voucher.children_named("ALLLEDGERENTRIES.LIST").collect();
        assert_eq!(ledgers[0].child_text("ISDEEMEDPOSITIVE"), Some("Yes"));
        assert_eq!(ledgers[1].child_text("ISDEEMEDPOSITIVE"), Some("No"));
        assert_eq!(ledgers[0].child_text("AMOUNT"), Some("-1180"));

        let items: Vec<_> = voucher.children_named("ALLINVENTORYENTRIES.LIST").collect();
        assert_eq!(items[0].child_text("ISDEEMEDPOSITIVE"), Some("Yes"));
        assert_eq!(items[0].child_text("ACTUALQTY"), Some("10 Nos"));
        assert_eq!(items[1].child_text("ISDEEMEDPOSITIVE"), Some("No"));
        assert_eq!(items[1].child_text("BILLEDQTY"), Some("-1 Box"));

        assert_eq!(voucher.child_text("DATE"), Some("20260401"));
        assert_eq!(voucher.child_text("VOUCHERNUMBER"), Some("42"));
        assert!(voucher.child("NARRATION").is_none());
    }

    #[test]
    fn report_uses_report_id_and_range() {
        let doc = report(&ReportRequest {
            report_type: ReportKind::TrialBalance,
            from_date: "2026-04-01".into(),
            to_date: "2027-03-31".into(),
        })
        .unwrap();
        let root = XmlNode::parse(&doc).unwrap();
        assert_eq!(root.find("ID").and_then(|n| n.text()), Some("Trial Balance"));
        assert_eq!(root.find("SVFROMDATE").and_then(|n| n.text()), Some("20260401"));
        assert_eq!(root.find("SVTODATE").and_then(|n| n.text()), Some("20270331"));
        assert_eq!(
            root.find("SVEXPORTFORMAT").and_then(|n| n.text()),
            Some("$$SysName:XML")
        );
    }

    #[test]
    fn voucher_list_without_range_has_no_dates() {
        let doc = voucher_list(&VoucherQuery::default()).unwrap();
        assert!(doc.contains("<ID>Day Book</ID>"));
        assert!(!doc.contains("SVFROMDATE"));
    }

    #[test]
    fn collections_target_their_lists() {
        assert!(ledger_list().unwrap().contains("<ID>List of Ledgers</ID>"));
        let stock = stock_item_list().unwrap();
        assert!(stock.contains("<TYPE>Collection</TYPE>"));
        assert!(stock.contains("<ID>List of Stock Items</ID>"));
    }

    #[test]
    fn surrounding_whitespace_is_trimmed_interior_kept() {
        let doc = ledger(&ledger_payload(json!({
            "name": "  राम ट्रेडर्स\r\n₹ Unit\t2 \n",
            "city": " Pune "
        })))
        .unwrap();
        let root = XmlNode::parse(&doc).unwrap();
        let node = root.find("LEDGER").unwrap();
        assert_eq!(node.child_text("NAME"), Some("राम ट्रेडर्स\r\n₹ Unit\t2"));
        assert_eq!(node.attr("NAME"), Some("राम ट्रेडर्स\r\n₹ Unit\t2"));
        assert_eq!(node.child_text("CITY"), Some("Pune"));
    }

    proptest! {
        #[test]
        fn escaped_text_round_trips_through_parser(name in "[\\PC\t\r\n]{1,40}") {
            let expected = name.trim();
            prop_assume!(!expected.is_empty());
            let doc = ledger(&ledger_payload(json!({"name": name}))).unwrap();
            let root = XmlNode::parse(&doc).unwrap();
            let node = root.find("LEDGER").unwrap();
            prop_assert_eq!(node.child_text("NAME"), Some(expected));
            prop_assert_eq!(node.attr("NAME"), Some(expected));
        }
    }
}
