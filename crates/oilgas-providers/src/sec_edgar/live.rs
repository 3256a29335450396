//! Live SEC EDGAR fetch. Opt-in: nothing in this module runs unless a
//! caller explicitly invokes `fetch_live_events`.

use std::collections::HashMap;

use oilgas_http::{FetchConfig, HttpClient, RunCache};
use oilgas_universe::Universe;
use serde_json::{json, Value};

use super::form4::parse_form4_transactions;
use super::normalize_ticker_symbol;

const SEC_TICKER_MAP_URL: &str = "https://www.sec.gov/files/company_tickers.json";
const DEFAULT_USER_AGENT: &str = "OGREE/0.1 (research@ogree.local)";
const MAX_FILINGS_PER_COMPANY: usize = 20;

/// Run-scoped counters surfaced through the observability snapshot.
#[derive(Debug, Clone, Default)]
pub struct Form4Stats {
    pub form4_filings_seen: u64,
    pub form4_filings_parsed: u64,
    pub form4_filings_skipped: u64,
    pub form4_transactions_emitted: u64,
    pub institutional_events_emitted: u64,
}

fn submissions_url(cik_10: &str) -> String {
    format!("https://data.sec.gov/submissions/CIK{cik_10}.json")
}

fn filing_url(cik_10: &str, accession: &str, primary_document: &str) -> Option<String> {
    if accession.is_empty() || primary_document.is_empty() {
        return None;
    }
    let cik: u64 = cik_10.parse().ok()?;
    let accession_clean = accession.replace('-', "");
    Some(format!("https://www.sec.gov/Archives/edgar/data/{cik}/{accession_clean}/{primary_document}"))
}

fn filing_txt_url(cik_10: &str, accession: &str) -> Option<String> {
    if accession.is_empty() {
        return None;
    }
    let cik: u64 = cik_10.parse().ok()?;
    let accession_clean = accession.replace('-', "");
    Some(format!("https://www.sec.gov/Archives/edgar/data/{cik}/{accession_clean}/{accession}.txt"))
}

fn classify_form_event_type(form: &str) -> Option<&'static str> {
    match form.trim().to_uppercase().as_str() {
        "4" | "4/A" => Some("form4"),
        "SC 13G" | "SC 13G/A" | "13G" | "13G/A" => Some("institutional_13g"),
        "13F-HR" | "13F-HR/A" => Some("institutional_13f"),
        _ => None,
    }
}

fn load_ticker_to_cik_map(client: &HttpClient, cache: &mut RunCache) -> HashMap<String, String> {
    let payload = client.fetch_json_cached(SEC_TICKER_MAP_URL, "application/json", cache, "ticker_to_cik_raw");
    let mut out = HashMap::new();
    let Some(rows) = payload.as_object() else { return out };
    for row in rows.values() {
        let Some(ticker) = row.get("ticker").and_then(Value::as_str).and_then(normalize_ticker_symbol) else {
            continue;
        };
        let Some(cik) = row.get("cik_str") else { continue };
        let cik_str = match cik {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.trim().to_string(),
            _ => continue,
        };
        out.insert(ticker, format!("{cik_str:0>10}"));
    }
    out
}

/// One raw-event envelope ready to feed through `canonicalize`/insert,
/// matching the `{source_system, source_event_id, event_time,
/// payload_json}` shape every fixture row carries.
pub struct LiveEvent {
    pub source_event_id: String,
    pub event_time: Option<String>,
    pub payload: Value,
}

/// Fetches recent Form 4 / 13G / 13F filings for every company in
/// `universe` that has a resolvable ticker, parsing Form 4 transactions
/// inline. Never panics and never surfaces a network error — an
/// unreachable SEC endpoint simply yields no events for that company.
pub fn fetch_live_events(universe: &Universe, stats: &mut Form4Stats) -> Vec<LiveEvent> {
    let client = HttpClient::new(FetchConfig::new(DEFAULT_USER_AGENT));
    let mut cache: RunCache = HashMap::new();

    let ticker_to_cik = load_ticker_to_cik_map(&client, &mut cache);
    if ticker_to_cik.is_empty() {
        return Vec::new();
    }

    let mut events = Vec::new();

    for company in &universe.companies {
        let normalized_tickers: Vec<String> =
            company.tickers.iter().filter_map(|t| normalize_ticker_symbol(t)).collect();
        let Some(cik_10) = normalized_tickers.iter().find_map(|t| ticker_to_cik.get(t)).cloned() else {
            continue;
        };

        let submissions = client.fetch_json(&submissions_url(&cik_10), "application/json");
        let Some(forms) = submissions
            .get("filings")
            .and_then(|f| f.get("recent"))
            .and_then(|r| r.get("form"))
            .and_then(Value::as_array)
        else {
            continue;
        };
        let recent = &submissions["filings"]["recent"];

        let mut filings_processed = 0usize;
        for (idx, form) in forms.iter().enumerate() {
            let Some(form_str) = form.as_str() else { continue };
            let Some(event_type) = classify_form_event_type(form_str) else { continue };
            if filings_processed >= MAX_FILINGS_PER_COMPANY {
                break;
            }

            let accession = recent.get("accessionNumber").and_then(Value::as_array).and_then(|a| a.get(idx)).and_then(Value::as_str);
            let filing_date = recent.get("filingDate").and_then(Value::as_array).and_then(|a| a.get(idx)).and_then(Value::as_str);
            let primary_document = recent.get("primaryDocument").and_then(Value::as_array).and_then(|a| a.get(idx)).and_then(Value::as_str);
            let (Some(accession), Some(filing_date)) = (accession, filing_date) else { continue };
            filings_processed += 1;

            let url = filing_url(&cik_10, accession, primary_document.unwrap_or(""));

            if event_type == "form4" {
                stats.form4_filings_seen += 1;
                let text = url.as_deref().map(|u| client.fetch_text(u, "text/plain,application/xml,application/xhtml+xml,*/*")).unwrap_or_default();
                let mut tx_rows = parse_form4_transactions(&text);
                if tx_rows.is_empty() {
                    if let Some(txt_url) = filing_txt_url(&cik_10, accession) {
                        let fallback = client.fetch_text(&txt_url, "text/plain,application/xml,application/xhtml+xml,*/*");
                        tx_rows = parse_form4_transactions(&fallback);
                    }
                }

                let mut emitted = 0u64;
                for (tx_idx, tx) in tx_rows.iter().enumerate() {
                    emitted += 1;
                    let payload = json!({
                        "type": tx.event_type,
                        "form_type": form_str,
                        "filing_accession": accession,
                        "filer_name": tx.filer_name.clone().unwrap_or_else(|| company.name.clone()),
                        "relationship": tx.relationship,
                        "transaction_type": tx.transaction_type,
                        "shares": tx.shares,
                        "price_per_share": tx.price_per_share,
                        "total_value": tx.total_value,
                        "transaction_code": tx.transaction_code,
                        "acquired_disposed_code": tx.acquired_disposed_code,
                        "security_title": tx.security_title,
                        "underlying_security_title": tx.underlying_security_title,
                        "direct_or_indirect": tx.direct_or_indirect,
                        "company": company.name,
                        "tickers": company.tickers,
                        "cik": cik_10,
                        "filing_url": url,
                        "co_reporting_owner_count": tx.co_reporting_owner_count,
                        "officer_title": tx.officer_title,
                    });
                    events.push(LiveEvent {
                        source_event_id: format!("sec_live_{accession}_{tx_idx}"),
                        event_time: tx.transaction_date.clone().or_else(|| Some(filing_date.to_string())),
                        payload,
                    });
                }
                if emitted > 0 {
                    stats.form4_filings_parsed += 1;
                    stats.form4_transactions_emitted += emitted;
                } else {
                    stats.form4_filings_skipped += 1;
                }
                continue;
            }

            let payload = json!({
                "type": event_type,
                "form_type": form_str,
                "filing_accession": accession,
                "filer_name": company.name,
                "relationship": "institution",
                "transaction_type": "purchase",
                "shares": Value::Null,
                "price_per_share": Value::Null,
                "total_value": Value::Null,
                "company": company.name,
                "tickers": company.tickers,
                "cik": cik_10,
                "filing_url": url,
            });
            events.push(LiveEvent {
                source_event_id: format!("sec_live_{accession}"),
                event_time: Some(filing_date.to_string()),
                payload,
            });
            stats.institutional_events_emitted += 1;
        }
    }

    events
}
