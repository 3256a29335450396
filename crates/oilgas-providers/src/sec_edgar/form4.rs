//! Form 4 (insider transaction) XML extraction and parsing.
//!
//! SEC full-text submissions wrap the `<ownershipDocument>` payload in an
//! SGML `<XML>...</XML>` block; the `.txt` fallback submission wraps it
//! again in a `<SEC-DOCUMENT>` envelope. `extract_form4_xml` peels
//! whichever wrapper is present before handing the inner document to the
//! XML reader.

use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use serde::Serialize;

static OWNERSHIP_DOC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)(<ownershipDocument[\s\S]*?</ownershipDocument>)").expect("valid regex")
});
static XML_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<XML>([\s\S]*?)</XML>").expect("valid regex"));

/// Extracts the inner `<ownershipDocument>...</ownershipDocument>` text
/// from a possibly SGML-wrapped filing body. Returns `None` when no such
/// document can be found — never an error.
pub fn extract_form4_xml(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    let s = text.trim();

    if s.contains("<ownershipDocument") && s.starts_with('<') {
        return Some(
            OWNERSHIP_DOC_RE
                .captures(s)
                .map(|c| c[1].to_string())
                .unwrap_or_else(|| s.to_string()),
        );
    }

    if let Some(xml_block) = XML_BLOCK_RE.captures(s) {
        let chunk = xml_block[1].trim();
        if chunk.contains("<ownershipDocument") {
            return Some(
                OWNERSHIP_DOC_RE
                    .captures(chunk)
                    .map(|c| c[1].to_string())
                    .unwrap_or_else(|| chunk.to_string()),
            );
        }
    }

    OWNERSHIP_DOC_RE.captures(s).map(|c| c[1].to_string())
}

/// Minimal in-memory XML tree: element names have any namespace prefix
/// stripped (the same effect as ElementTree's `{*}` wildcard match), and
/// only text content and child elements are tracked.
#[derive(Debug, Default)]
struct XmlNode {
    name: String,
    text: String,
    children: Vec<XmlNode>,
}

impl XmlNode {
    fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All descendants (any depth) with this local name, in document order.
    fn find_all(&self, name: &str) -> Vec<&XmlNode> {
        let mut out = Vec::new();
        for child in &self.children {
            if child.name == name {
                out.push(child);
            }
            out.extend(child.find_all(name));
        }
        out
    }

    /// Text of the direct-child chain named by `path`, trimmed; `None`
    /// when any segment is missing or the final text is blank.
    fn text_at(&self, path: &[&str]) -> Option<String> {
        let mut node = self;
        for part in path {
            node = node.child(part)?;
        }
        let trimmed = node.text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

fn local_name(raw: &[u8]) -> String {
    let s = String::from_utf8_lossy(raw);
    match s.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => s.to_string(),
    }
}

/// Parses an XML document into the flattened tree above. Returns `None`
/// on malformed XML rather than propagating a parse error, mirroring
/// `ET.ParseError` being swallowed in the source adapter.
fn parse_tree(xml: &str) -> Option<XmlNode> {
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<XmlNode> = vec![XmlNode { name: "#root".into(), text: String::new(), children: vec![] }];
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                stack.push(XmlNode { name: local_name(e.name().as_ref()), text: String::new(), children: vec![] });
            }
            Ok(Event::Empty(e)) => {
                let node = XmlNode { name: local_name(e.name().as_ref()), text: String::new(), children: vec![] };
                stack.last_mut()?.children.push(node);
            }
            Ok(Event::End(_)) => {
                if stack.len() <= 1 {
                    return None;
                }
                let finished = stack.pop()?;
                stack.last_mut()?.children.push(finished);
            }
            Ok(Event::Text(e)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return None,
        }
        buf.clear();
    }

    stack.pop()?.children.into_iter().find(|n| n.name == "ownershipDocument")
}

fn truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(str::to_lowercase).as_deref(),
        Some("1") | Some("true") | Some("t") | Some("yes") | Some("y")
    )
}

fn as_float(value: Option<&str>) -> Option<f64> {
    value.and_then(|v| v.trim().parse::<f64>().ok())
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportingOwner {
    pub filer_name: Option<String>,
    pub relationship: Option<String>,
    pub officer_title: Option<String>,
    pub co_reporting_owner_count: u64,
}

fn parse_reporting_owner(root: &XmlNode) -> ReportingOwner {
    let owners = root.find_all("reportingOwner");
    let Some(first) = owners.first() else {
        return ReportingOwner::default();
    };

    let rel = first.child("reportingOwnerRelationship");
    let is_director = truthy(rel.and_then(|r| r.text_at(&["isDirector"])).as_deref());
    let is_officer = truthy(rel.and_then(|r| r.text_at(&["isOfficer"])).as_deref());
    let is_ten_pct = truthy(rel.and_then(|r| r.text_at(&["isTenPercentOwner"])).as_deref());
    let officer_title = rel.and_then(|r| r.text_at(&["officerTitle"]));
    let is_other = truthy(rel.and_then(|r| r.text_at(&["isOther"])).as_deref());
    let other_text = rel.and_then(|r| r.text_at(&["otherText"]));

    let mut parts: Vec<String> = Vec::new();
    if is_officer {
        parts.push("officer".to_string());
    }
    if is_director {
        parts.push("director".to_string());
    }
    if is_ten_pct {
        parts.push("10% owner".to_string());
    }
    if is_other {
        if let Some(text) = &other_text {
            parts.push(text.clone());
        }
    }
    if parts.is_empty() && is_other {
        parts.push("other".to_string());
    }
    let relationship = if parts.is_empty() { None } else { Some(parts.join("/")) };

    ReportingOwner {
        filer_name: first.text_at(&["reportingOwnerId", "rptOwnerName"]),
        relationship,
        officer_title,
        co_reporting_owner_count: owners.len().saturating_sub(1) as u64,
    }
}

/// Maps a Form 4 `transactionCode` letter to `(event_type, transaction_type)`.
pub fn classify_form4_transaction(code: Option<&str>) -> (Option<&'static str>, Option<&'static str>) {
    match code.map(|c| c.trim().to_uppercase()).as_deref() {
        Some("P") => (Some("insider_buy"), Some("purchase")),
        Some("S") => (Some("insider_sell"), Some("sale")),
        Some("M") => (Some("insider_option_exercise"), Some("exercise")),
        _ => (None, None),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Form4Transaction {
    pub event_type: &'static str,
    pub transaction_type: Option<&'static str>,
    pub transaction_code: Option<String>,
    pub transaction_date: Option<String>,
    pub shares: Option<f64>,
    pub price_per_share: Option<f64>,
    pub total_value: Option<f64>,
    pub acquired_disposed_code: Option<String>,
    pub security_title: Option<String>,
    pub underlying_security_title: Option<String>,
    pub direct_or_indirect: Option<String>,
    pub bucket: &'static str,
    pub filer_name: Option<String>,
    pub relationship: Option<String>,
    pub officer_title: Option<String>,
    pub co_reporting_owner_count: u64,
}

/// Extracts and parses every non-derivative and derivative transaction
/// row out of a Form 4 filing body. Returns an empty vec on anything
/// unparseable — malformed filings never fail the batch.
pub fn parse_form4_transactions(text: &str) -> Vec<Form4Transaction> {
    let Some(xml_doc) = extract_form4_xml(text) else {
        return Vec::new();
    };
    let Some(root) = parse_tree(&xml_doc) else {
        return Vec::new();
    };

    let owner = parse_reporting_owner(&root);
    let mut tx_nodes: Vec<(&'static str, &XmlNode)> = Vec::new();
    tx_nodes.extend(root.find_all("nonDerivativeTransaction").into_iter().map(|n| ("non_derivative", n)));
    tx_nodes.extend(root.find_all("derivativeTransaction").into_iter().map(|n| ("derivative", n)));

    let mut rows = Vec::new();
    for (bucket, tx) in tx_nodes {
        let transaction_code = tx.child("transactionCoding").and_then(|c| c.text_at(&["transactionCode"]));
        let (event_type, transaction_type) = classify_form4_transaction(transaction_code.as_deref());
        let Some(event_type) = event_type else { continue };

        let shares = tx
            .child("transactionAmounts")
            .and_then(|a| a.child("transactionShares"))
            .and_then(|s| s.text_at(&["value"]));
        let price = tx
            .child("transactionAmounts")
            .and_then(|a| a.child("transactionPricePerShare"))
            .and_then(|p| p.text_at(&["value"]));
        let shares = as_float(shares.as_deref());
        let price = as_float(price.as_deref());
        let total_value = match (shares, price) {
            (Some(s), Some(p)) => Some((s * p * 100.0).round() / 100.0),
            _ => None,
        };

        rows.push(Form4Transaction {
            event_type,
            transaction_type,
            transaction_code,
            transaction_date: tx.child("transactionDate").and_then(|d| d.text_at(&["value"])),
            shares,
            price_per_share: price,
            total_value,
            acquired_disposed_code: tx
                .child("transactionAmounts")
                .and_then(|a| a.child("transactionAcquiredDisposedCode"))
                .and_then(|c| c.text_at(&["value"])),
            security_title: tx.child("securityTitle").and_then(|s| s.text_at(&["value"])),
            underlying_security_title: tx
                .child("underlyingSecurity")
                .and_then(|u| u.child("underlyingSecurityTitle"))
                .and_then(|t| t.text_at(&["value"])),
            direct_or_indirect: tx
                .child("ownershipNature")
                .and_then(|o| o.child("directOrIndirectOwnership"))
                .and_then(|d| d.text_at(&["value"])),
            bucket,
            filer_name: owner.filer_name.clone(),
            relationship: owner.relationship.clone(),
            officer_title: owner.officer_title.clone(),
            co_reporting_owner_count: owner.co_reporting_owner_count,
        });
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <ownershipDocument>
          <reportingOwner>
            <reportingOwnerId><rptOwnerName>Jane Q. Insider</rptOwnerName></reportingOwnerId>
            <reportingOwnerRelationship>
              <isDirector>1</isDirector>
              <isOfficer>0</isOfficer>
              <isTenPercentOwner>0</isTenPercentOwner>
            </reportingOwnerRelationship>
          </reportingOwner>
          <nonDerivativeTransaction>
            <securityTitle><value>Common Stock</value></securityTitle>
            <transactionDate><value>2026-01-15</value></transactionDate>
            <transactionCoding><transactionCode>P</transactionCode></transactionCoding>
            <transactionAmounts>
              <transactionShares><value>1000</value></transactionShares>
              <transactionPricePerShare><value>12.50</value></transactionPricePerShare>
              <transactionAcquiredDisposedCode><value>A</value></transactionAcquiredDisposedCode>
            </transactionAmounts>
            <ownershipNature><directOrIndirectOwnership><value>D</value></directOrIndirectOwnership></ownershipNature>
          </nonDerivativeTransaction>
        </ownershipDocument>
    "#;

    #[test]
    fn extracts_bare_ownership_document() {
        assert!(extract_form4_xml(SAMPLE).unwrap().contains("<ownershipDocument>"));
    }

    #[test]
    fn extracts_from_sgml_xml_wrapper() {
        let wrapped = format!("<SEC-DOCUMENT>junk<XML>{SAMPLE}</XML>more junk</SEC-DOCUMENT>");
        assert!(extract_form4_xml(&wrapped).unwrap().contains("<ownershipDocument>"));
    }

    #[test]
    fn parses_purchase_transaction() {
        let rows = parse_form4_transactions(SAMPLE);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].event_type, "insider_buy");
        assert_eq!(rows[0].transaction_type, Some("purchase"));
        assert_eq!(rows[0].shares, Some(1000.0));
        assert_eq!(rows[0].total_value, Some(12500.0));
        assert_eq!(rows[0].relationship.as_deref(), Some("director"));
        assert_eq!(rows[0].filer_name.as_deref(), Some("Jane Q. Insider"));
    }

    #[test]
    fn unknown_transaction_code_is_dropped() {
        let sample = SAMPLE.replace("<transactionCode>P</transactionCode>", "<transactionCode>J</transactionCode>");
        assert!(parse_form4_transactions(&sample).is_empty());
    }

    #[test]
    fn malformed_xml_yields_no_rows() {
        assert!(parse_form4_transactions("<ownershipDocument><unterminated").is_empty());
    }

    #[test]
    fn co_reporting_owner_count_excludes_first_filer() {
        let two_owners = SAMPLE.replace(
            "</reportingOwner>",
            "</reportingOwner><reportingOwner><reportingOwnerId><rptOwnerName>Second Filer</rptOwnerName></reportingOwnerId></reportingOwner>",
        );
        let rows = parse_form4_transactions(&two_owners);
        assert_eq!(rows[0].co_reporting_owner_count, 1);
    }
}
