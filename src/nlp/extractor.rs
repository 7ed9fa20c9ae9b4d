//! Label Field Extraction
//!
//! Pulls the structured bits (medicine name, dosage, expiry) out of raw
//! OCR text. Packaging text is messy, so every field has a fallback chain
//! and extraction itself never fails.

use chrono::{Days, Months, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Structured fields recovered from one label.
///
/// Empty strings mean "nothing matched". The name is the exception: it falls
/// back to the first OCR line and finally to `"Unknown"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub name: String,
    pub dosage: String,
    pub expiry: String,
}

pub struct LabelExtractor {
    re_name: Regex,
    re_strength: Regex,
    re_frequency: Regex,
    re_expiry: Vec<Regex>,
    re_iso_tail: Regex,
    re_month_tail: Regex,
}

impl LabelExtractor {
    pub fn new() -> Self {
        Self {
            // Medicine name: first capitalized word or sequence
            re_name: Regex::new(r"([A-Z][a-zA-Z0-9]+(?: [A-Z][a-zA-Z0-9]+)*)").unwrap(),
            // Dosage strength: 500mg, 10 ml, 50 MCG
            re_strength: Regex::new(r"(?i)(\d+\s?(mg|ml|mcg))").unwrap(),
            // Frequency wording used when no strength is printed
            re_frequency: Regex::new(r"(?i)((once|twice|thrice|\d+ times) (a|per) day)").unwrap(),
            // Expiry forms, tried in order: Expiry: 12/2026, Exp: 01-27, Expires 05/2028, Exp 2027-01-02
            re_expiry: vec![
                Regex::new(r"(?i)(Exp(?:iry)?[:\s]*[0-9]{1,2}[/-][0-9]{2,4})").unwrap(),
                Regex::new(r"(?i)(Expires?[:\s]*[0-9]{1,2}[/-][0-9]{2,4})").unwrap(),
                Regex::new(r"(?i)(Exp(?:iry)?[:\s]*[0-9]{4}-[0-9]{2}-[0-9]{2})").unwrap(),
            ],
            re_iso_tail: Regex::new(r"(\d{4}-\d{2}-\d{2})").unwrap(),
            re_month_tail: Regex::new(r"(\d{1,2})[/-](\d{2,4})").unwrap(),
        }
    }

    pub fn extract(&self, text: &str) -> ExtractedFields {
        ExtractedFields {
            name: self.extract_name(text),
            dosage: self.extract_dosage(text),
            expiry: self.extract_expiry(text),
        }
    }

    fn extract_name(&self, text: &str) -> String {
        if let Some(cap) = self.re_name.captures(text) {
            return cap[1].to_string();
        }
        // OCR usually puts the brand name on the first printed line
        text.lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("Unknown")
            .to_string()
    }

    fn extract_dosage(&self, text: &str) -> String {
        if let Some(cap) = self.re_strength.captures(text) {
            return cap[1].to_string();
        }
        if let Some(cap) = self.re_frequency.captures(text) {
            return cap[1].to_string();
        }
        String::new()
    }

    fn extract_expiry(&self, text: &str) -> String {
        for re in &self.re_expiry {
            if let Some(cap) = re.captures(text) {
                return cap[1].to_string();
            }
        }
        String::new()
    }

    /// Best-effort normalization of a raw expiry match to a calendar date.
    /// Month/year forms resolve to the last day of that month; two-digit
    /// years are taken as 20xx. Returns None rather than guessing badly.
    pub fn expiry_date(&self, raw: &str) -> Option<NaiveDate> {
        if raw.is_empty() {
            return None;
        }

        if let Some(cap) = self.re_iso_tail.captures(raw) {
            if let Ok(date) = NaiveDate::parse_from_str(&cap[1], "%Y-%m-%d") {
                return Some(date);
            }
        }

        let cap = self.re_month_tail.captures(raw)?;
        let month: u32 = cap[1].parse().ok()?;
        let year: i32 = cap[2].parse().ok()?;
        let year = if year < 100 { 2000 + year } else { year };
        if !(1..=12).contains(&month) {
            return None;
        }
        last_day_of_month(year, month)
    }
}

impl Default for LabelExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_months(Months::new(1))?
        .checked_sub_days(Days::new(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_sample_label() {
        let extractor = LabelExtractor::new();
        let fields = extractor.extract("Paracetamol 500mg, take twice a day. Expiry: 12/2026");
        assert_eq!(fields.name, "Paracetamol");
        assert_eq!(fields.dosage, "500mg");
        assert_eq!(fields.expiry, "Expiry: 12/2026");
    }

    #[test]
    fn test_frequency_fallback_when_no_strength() {
        let extractor = LabelExtractor::new();
        let fields = extractor.extract("CROCIN ADVANCE\ntake twice per day");
        assert_eq!(fields.name, "CROCIN ADVANCE");
        assert_eq!(fields.dosage, "twice per day");
        assert_eq!(fields.expiry, "");
    }

    #[test]
    fn test_name_falls_back_to_first_line() {
        let extractor = LabelExtractor::new();
        let fields = extractor.extract("ibuprofen 200 mg\nexp 05-2027");
        assert_eq!(fields.name, "ibuprofen 200 mg");
        assert_eq!(fields.dosage, "200 mg");
        assert_eq!(fields.expiry, "exp 05-2027");
    }

    #[test]
    fn test_name_unknown_on_empty_text() {
        let extractor = LabelExtractor::new();
        let fields = extractor.extract("");
        assert_eq!(fields.name, "Unknown");
        assert_eq!(fields.dosage, "");
        assert_eq!(fields.expiry, "");
    }

    #[test]
    fn test_iso_expiry_form() {
        let extractor = LabelExtractor::new();
        let fields = extractor.extract("Amoxicillin\nExpiry: 2027-01-02");
        assert_eq!(fields.expiry, "Expiry: 2027-01-02");
        assert_eq!(
            extractor.expiry_date(&fields.expiry),
            NaiveDate::from_ymd_opt(2027, 1, 2)
        );
    }

    #[test]
    fn test_month_year_expiry_resolves_to_month_end() {
        let extractor = LabelExtractor::new();
        assert_eq!(
            extractor.expiry_date("Expiry: 12/2026"),
            NaiveDate::from_ymd_opt(2026, 12, 31)
        );
        assert_eq!(
            extractor.expiry_date("exp 02-28"),
            NaiveDate::from_ymd_opt(2028, 2, 29)
        );
    }

    #[test]
    fn test_expiry_date_rejects_nonsense() {
        let extractor = LabelExtractor::new();
        assert_eq!(extractor.expiry_date(""), None);
        assert_eq!(extractor.expiry_date("Exp: 27/04"), None);
    }
}
