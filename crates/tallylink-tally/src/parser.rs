// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response decoding.
//!
//! Responses are read into a small element tree with quick-xml, then
//! decoded into typed records. Malformed XML is a hard protocol error; a
//! well-formed response carrying error text is a protocol error too, never a
//! partial success.

use std::error::Error as StdError;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tallylink_core::AgentError;

use crate::types::{
    ImportResult, LedgerRecord, StockItemRecord, StockSummaryRow, TrialBalanceRow, VoucherRecord,
};

/// One element of a parsed document. Text is trimmed and unescaped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlNode>,
}

fn malformed<E>(e: E) -> AgentError
where
    E: StdError + Send + Sync + 'static,
{
    AgentError::Protocol {
        message: format!("malformed XML: {e}"),
        source: Some(Box::new(e)),
    }
}

fn start_node(start: &BytesStart<'_>) -> Result<XmlNode, AgentError> {
    let mut node = XmlNode {
        name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
        ..XmlNode::default()
    };
    for attr in start.attributes() {
        let attr = attr.map_err(malformed)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(malformed)?.into_owned();
        node.attrs.push((key, value));
    }
    Ok(node)
}

impl XmlNode {
    /// Parse a whole document and return its root element.
    pub fn parse(xml: &str) -> Result<XmlNode, AgentError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;

        loop {
            match reader.read_event().map_err(malformed)? {
                Event::Start(start) => stack.push(start_node(&start)?),
                Event::Empty(start) => {
                    let node = start_node(&start)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => root = root.or(Some(node)),
                    }
                }
                Event::End(_) => {
                    // quick-xml has already matched the end tag against the start tag.
                    let node = stack
                        .pop()
                        .ok_or_else(|| AgentError::protocol("malformed XML: unmatched end tag"))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => root = root.or(Some(node)),
                    }
                }
                Event::Text(text) => {
                    if let Some(node) = stack.last_mut() {
                        node.text.push_str(&text.unescape().map_err(malformed)?);
                    }
                }
                Event::CData(data) => {
                    if let Some(node) = stack.last_mut() {
                        node.text
                            .push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(AgentError::protocol(format!(
                "malformed XML: unclosed element <{}>",
                open.name
            )));
        }
        root.ok_or_else(|| AgentError::protocol("malformed XML: no root element"))
    }

    /// First direct child with this name.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Every direct child with this name, in document order. One element
    /// and many are handled alike.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Depth-first search of the subtree, the node itself included.
    pub fn find(&self, name: &str) -> Option<&XmlNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Every element with this name in the subtree, in document order.
    pub fn find_all<'a>(&'a self, name: &str, out: &mut Vec<&'a XmlNode>) {
        if self.name == name {
            out.push(self);
        }
        for child in &self.children {
            child.find_all(name, out);
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Own text, `None` when empty.
    pub fn text(&self) -> Option<&str> {
        (!self.text.is_empty()).then_some(self.text.as_str())
    }

    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(XmlNode::text)
    }

    /// A record field: child element text, else an attribute of the same name.
    fn field(&self, name: &str) -> String {
        self.child_text(name)
            .or_else(|| self.attr(name))
            .unwrap_or_default()
            .to_string()
    }

    /// Record name: `NAME` child, `NAME` attribute, then the element's own text.
    fn record_name(&self) -> String {
        self.child_text("NAME")
            .or_else(|| self.attr("NAME"))
            .or_else(|| self.text())
            .unwrap_or_default()
            .to_string()
    }

    /// Numeric field; absent or unparseable values read as 0.
    fn number(&self, name: &str) -> f64 {
        self.child_text(name)
            .or_else(|| self.attr(name))
            .and_then(|t| t.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }
}

/// Parse a response and fail on any error section it carries.
fn parse_checked(xml: &str) -> Result<XmlNode, AgentError> {
    let root = XmlNode::parse(xml)?;
    if root.name != "ENVELOPE" {
        return Err(AgentError::protocol(format!(
            "unexpected root element <{}>",
            root.name
        )));
    }
    let errors = error_messages(&root);
    if !errors.is_empty() {
        return Err(AgentError::protocol(format!(
            "Tally Error: {}",
            errors.join(", ")
        )));
    }
    Ok(root)
}

/// Error strings in a response.
///
/// `LINEERROR` elements carry messages. `ERRORS` is either a message or a
/// count; blank and `0` mean no error. When line errors exist a bare count
/// adds nothing and is dropped.
pub fn error_messages(root: &XmlNode) -> Vec<String> {
    let mut line_errors = Vec::new();
    root.find_all("LINEERROR", &mut line_errors);
    let mut messages: Vec<String> = line_errors
        .iter()
        .filter_map(|n| n.text())
        .map(str::to_string)
        .collect();

    let mut errors = Vec::new();
    root.find_all("ERRORS", &mut errors);
    for text in errors.iter().filter_map(|n| n.text()) {
        let is_count = text.parse::<u64>().is_ok();
        if text == "0" || (is_count && !messages.is_empty()) {
            continue;
        }
        messages.push(text.to_string());
    }
    messages
}

/// Decode the result of an import request.
pub fn import_result(xml: &str) -> Result<ImportResult, AgentError> {
    let root = parse_checked(xml)?;
    let result = root
        .find("IMPORTRESULT")
        .ok_or_else(|| AgentError::protocol("Invalid Tally response format: missing IMPORTRESULT"))?;
    Ok(ImportResult {
        created: result.child_text("CREATED").map(str::trim) == Some("1"),
        master_id: result.child_text("LASTMID").map(str::to_string),
        voucher_id: result.child_text("LASTVCHID").map(str::to_string),
    })
}

/// Elements named `tag` directly under the response's `COLLECTION`.
fn collection<'a>(root: &'a XmlNode, tag: &'a str) -> Vec<&'a XmlNode> {
    root.find("COLLECTION")
        .map(|c| c.children_named(tag).collect())
        .unwrap_or_default()
}

pub fn ledgers(xml: &str) -> Result<Vec<LedgerRecord>, AgentError> {
    let root = parse_checked(xml)?;
    Ok(collection(&root, "LEDGER")
        .into_iter()
        .map(|n| LedgerRecord {
            name: n.record_name(),
            parent: n.field("PARENT"),
            alias: n.field("ALIAS"),
            guid: n.field("GUID"),
        })
        .collect())
}

pub fn stock_items(xml: &str) -> Result<Vec<StockItemRecord>, AgentError> {
    let root = parse_checked(xml)?;
    Ok(collection(&root, "STOCKITEM")
        .into_iter()
        .map(|n| StockItemRecord {
            name: n.record_name(),
            parent: n.field("PARENT"),
            alias: n.field("ALIAS"),
            base_unit: n.field("BASEUNITS"),
            guid: n.field("GUID"),
        })
        .collect())
}

pub fn vouchers(xml: &str) -> Result<Vec<VoucherRecord>, AgentError> {
    let root = parse_checked(xml)?;
    Ok(collection(&root, "VOUCHER")
        .into_iter()
        .map(|n| VoucherRecord {
            date: n.field("DATE"),
            voucher_type: n.field("VOUCHERTYPENAME"),
            voucher_number: n.field("VOUCHERNUMBER"),
            party: n.field("PARTYLEDGERNAME"),
            amount: n.number("AMOUNT"),
            narration: n.field("NARRATION"),
        })
        .collect())
}

pub fn trial_balance(xml: &str) -> Result<Vec<TrialBalanceRow>, AgentError> {
    let root = parse_checked(xml)?;
    Ok(collection(&root, "LEDGER")
        .into_iter()
        .map(|n| TrialBalanceRow {
            name: n.record_name(),
            parent: n.field("PARENT"),
            opening_balance: n.number("OPENINGBALANCE"),
            closing_balance: n.number("CLOSINGBALANCE"),
            debit: n.number("DEBIT"),
            credit: n.number("CREDIT"),
        })
        .collect())
}

pub fn stock_summary(xml: &str) -> Result<Vec<StockSummaryRow>, AgentError> {
    let root = parse_checked(xml)?;
    Ok(collection(&root, "STOCKITEM")
        .into_iter()
        .map(|n| StockSummaryRow {
            name: n.record_name(),
            closing_balance: n.number("CLOSINGBALANCE"),
            closing_value: n.number("CLOSINGVALUE"),
            closing_rate: n.number("CLOSINGRATE"),
            unit: n.field("BASEUNITS"),
        })
        .collect())
}

/// Name of the loaded company, if the response names one.
pub fn company_name(xml: &str) -> Result<Option<String>, AgentError> {
    let root = parse_checked(xml)?;
    Ok(root
        .find("COMPANY")
        .map(XmlNode::record_name)
        .filter(|name| !name.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CREATED: &str = r#"<ENVELOPE>
 <HEADER><VERSION>1</VERSION><STATUS>1</STATUS></HEADER>
 <BODY>
  <IMPORTRESULT>
   <CREATED>1</CREATED><ALTERED>0</ALTERED><ERRORS>0</ERRORS>
   <LASTMID>101</LASTMID>
  </IMPORTRESULT>
 </BODY>
</ENVELOPE>"#;

    #[test]
    fn import_success_with_zero_error_count() {
        let result = import_result(CREATED).unwrap();
        assert!(result.created);
        assert_eq!(result.master_id.as_deref(), Some("101"));
        assert!(result.voucher_id.is_none());
    }

    #[test]
    fn import_error_section_is_a_failure() {
        let xml = r#"<ENVELOPE><BODY><IMPORTRESULT>
            <CREATED>0</CREATED><ERRORS>1</ERRORS>
            <LINEERROR>Ledger 'Acme' does not exist!</LINEERROR>
            <LINEERROR>Voucher totals do not match!</LINEERROR>
        </IMPORTRESULT></BODY></ENVELOPE>"#;
        let err = import_result(xml).unwrap_err();
        assert!(matches!(err, AgentError::Protocol { .. }));
        assert_eq!(
            err.to_string(),
            "protocol error: Tally Error: Ledger 'Acme' does not exist!, Voucher totals do not match!"
        );
    }

    #[test]
    fn textual_errors_element_is_reported() {
        let xml = "<ENVELOPE><BODY><IMPORTRESULT><ERRORS>Duplicate entry</ERRORS>\
                   </IMPORTRESULT></BODY></ENVELOPE>";
        let err = import_result(xml).unwrap_err();
        assert!(err.to_string().contains("Tally Error: Duplicate entry"));
    }

    #[test]
    fn missing_import_result_is_protocol_error() {
        let err = import_result("<ENVELOPE><BODY/></ENVELOPE>").unwrap_err();
        assert!(err.to_string().contains("missing IMPORTRESULT"));
    }

    #[test]
    fn malformed_xml_is_not_swallowed() {
        for xml in [
            "",
            "<ENVELOPE><BODY></ENVELOPE>",
            "<ENVELOPE><BODY>",
            "not xml at all",
            "<ENVELOPE><NAME>a & b</NAME></ENVELOPE>",
        ] {
            let err = XmlNode::parse(xml).unwrap_err();
            assert!(
                matches!(err, AgentError::Protocol { .. }),
                "{xml:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn single_and_repeated_records_decode_alike() {
        let one = r#"<ENVELOPE><BODY><DATA><COLLECTION>
            <LEDGER NAME="Cash"><PARENT>Cash-in-Hand</PARENT></LEDGER>
        </COLLECTION></DATA></BODY></ENVELOPE>"#;
        let many = r#"<ENVELOPE><BODY><DATA><COLLECTION>
            <LEDGER NAME="Cash"><PARENT>Cash-in-Hand</PARENT></LEDGER>
            <LEDGER><NAME>Acme &amp; Co</NAME><PARENT>Sundry Debtors</PARENT>
                <GUID>g-2</GUID></LEDGER>
            <LEDGER>Bank</LEDGER>
        </COLLECTION></DATA></BODY></ENVELOPE>"#;

        let single = ledgers(one).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].name, "Cash");
        assert_eq!(single[0].parent, "Cash-in-Hand");

        let list = ledgers(many).unwrap();
        let names: Vec<&str> = list.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Cash", "Acme & Co", "Bank"]);
        assert_eq!(list[1].guid, "g-2");
        assert_eq!(list[2].parent, "");
    }

    #[test]
    fn empty_collection_is_empty_list() {
        let xml = "<ENVELOPE><BODY><DATA></DATA></BODY></ENVELOPE>";
        assert!(stock_items(xml).unwrap().is_empty());
        assert!(vouchers(xml).unwrap().is_empty());
    }

    #[test]
    fn numeric_fields_fall_back_to_zero() {
        let xml = r#"<ENVELOPE><BODY><DATA><COLLECTION>
            <LEDGER NAME="Sales">
                <OPENINGBALANCE>-1500.50</OPENINGBALANCE>
                <CLOSINGBALANCE>n/a</CLOSINGBALANCE>
                <DEBIT> 200 </DEBIT>
            </LEDGER>
        </COLLECTION></DATA></BODY></ENVELOPE>"#;
        let rows = trial_balance(xml).unwrap();
        assert_eq!(rows[0].opening_balance, -1500.5);
        assert_eq!(rows[0].closing_balance, 0.0);
        assert_eq!(rows[0].debit, 200.0);
        assert_eq!(rows[0].credit, 0.0);
    }

    #[test]
    fn vouchers_decode_in_document_order() {
        let xml = r#"<ENVELOPE><BODY><DATA><COLLECTION>
            <VOUCHER><DATE>20260401</DATE><VOUCHERTYPENAME>Sales</VOUCHERTYPENAME>
                <VOUCHERNUMBER>1</VOUCHERNUMBER><PARTYLEDGERNAME>Acme</PARTYLEDGERNAME>
                <AMOUNT>1180</AMOUNT></VOUCHER>
            <VOUCHER><DATE>20260402</DATE><VOUCHERTYPENAME>Receipt</VOUCHERTYPENAME>
                <NARRATION><![CDATA[Paid <cash>]]></NARRATION></VOUCHER>
        </COLLECTION></DATA></BODY></ENVELOPE>"#;
        let list = vouchers(xml).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].amount, 1180.0);
        assert_eq!(list[1].voucher_type, "Receipt");
        assert_eq!(list[1].narration, "Paid <cash>");
        assert_eq!(list[1].amount, 0.0);
    }

    #[test]
    fn export_line_error_fails_read() {
        let xml = "<ENVELOPE><LINEERROR>Could not find Report 'Foo'!</LINEERROR></ENVELOPE>";
        assert!(ledgers(xml).is_err());
    }

    #[test]
    fn company_name_from_attribute_or_child() {
        let attr = r#"<ENVELOPE><COMPANY NAME="Acme Traders"/></ENVELOPE>"#;
        let child = "<ENVELOPE><BODY><COMPANY><NAME>Acme Traders</NAME></COMPANY></BODY></ENVELOPE>";
        assert_eq!(company_name(attr).unwrap().as_deref(), Some("Acme Traders"));
        assert_eq!(company_name(child).unwrap().as_deref(), Some("Acme Traders"));
        assert_eq!(company_name("<ENVELOPE/>").unwrap(), None);
    }

    #[test]
    fn wrong_root_rejected() {
        assert!(import_result("<RESPONSE>Unknown Request</RESPONSE>").is_err());
    }
}
