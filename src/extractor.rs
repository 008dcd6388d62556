use anyhow::anyhow;
use regex::Regex;
use scraper::{Html, Selector};

use crate::{
    record::{CommissionRecord, UNKNOWN_ADDRESS},
    text_manipulators::{
        extract_text, extract_trimmed_text, last_digit_run, last_path_segment,
        strip_digit_separators,
    },
};

/// Column holding the commission's address on the result page.
pub const ADDRESS_SELECTOR: &str = ".col-xs-12.col-sm-8.col-lg-9.col-xl-10";

const NAWROCKI: &str = "nawrocki";
const TRZASKOWSKI: &str = "trzaskowski";

fn parse_selector(selector: &str) -> anyhow::Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("invalid selector {selector:?}: {e}"))
}

/// Turns a rendered result page into a [`CommissionRecord`].
///
/// Extraction never fails: missing regions fall back to `"Unknown"` and
/// missing counts to `0`.
///
/// Counts are looked up in two passes:
/// 1. Every `<tr>` of every `<table>` whose text mentions a candidate
///    (case-insensitive). The last digit run of the row, after removing
///    thousands separators, is that candidate's count. Later rows overwrite
///    earlier ones.
/// 2. Only if both counts are still zero: the first number following each
///    candidate's name anywhere in the page text.
///
/// The last-number rule is a heuristic. A row such as
/// `Trzaskowski 1234 (55%)` yields `55`.
pub struct ResultExtractor {
    address_selector: Selector,
    table_selector: Selector,
    row_selector: Selector,
    nawrocki_in_text: Regex,
    trzaskowski_in_text: Regex,
}

impl ResultExtractor {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            address_selector: parse_selector(ADDRESS_SELECTOR)?,
            table_selector: parse_selector("table")?,
            row_selector: parse_selector("tr")?,
            nawrocki_in_text: Regex::new(r"(?i)Nawrocki[^0-9]*([0-9]+)")?,
            trzaskowski_in_text: Regex::new(r"(?i)Trzaskowski[^0-9]*([0-9]+)")?,
        })
    }

    pub fn extract(&self, document_text: &str, source_url: &str) -> CommissionRecord {
        let document = Html::parse_document(document_text);

        let address = document
            .select(&self.address_selector)
            .next()
            .map(extract_trimmed_text)
            .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string());

        let (mut nawrocki_votes, mut trzaskowski_votes) = self.votes_from_tables(&document);

        if nawrocki_votes == 0 && trzaskowski_votes == 0 {
            let page_text = extract_text(document.root_element());
            nawrocki_votes = first_number_after(&self.nawrocki_in_text, &page_text);
            trzaskowski_votes = first_number_after(&self.trzaskowski_in_text, &page_text);
        }

        CommissionRecord {
            id: last_path_segment(source_url).to_string(),
            address,
            nawrocki_votes,
            trzaskowski_votes,
        }
    }

    fn votes_from_tables(&self, document: &Html) -> (u64, u64) {
        let mut nawrocki = 0;
        let mut trzaskowski = 0;
        for table in document.select(&self.table_selector) {
            for row in table.select(&self.row_selector) {
                let row_text = extract_text(row);
                let lowered = row_text.to_lowercase();
                let matches_nawrocki = lowered.contains(NAWROCKI);
                let matches_trzaskowski = lowered.contains(TRZASKOWSKI);
                if !matches_nawrocki && !matches_trzaskowski {
                    continue;
                }

                let Some(count) = last_digit_run(&strip_digit_separators(&row_text)) else {
                    continue;
                };
                if matches_nawrocki {
                    nawrocki = count;
                }
                if matches_trzaskowski {
                    trzaskowski = count;
                }
            }
        }
        (nawrocki, trzaskowski)
    }
}

fn first_number_after(pattern: &Regex, text: &str) -> u64 {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}
