use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

const FORMATS: [&str; 3] = ["%d.%m.%Y", "%Y-%m-%d", "%d/%m/%Y"];

static EMBEDDED_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2})\.(\d{2})\.(\d{4})").expect("valid date pattern"));

/// Parse a period end date written in any of the formats seen in transcripts.
///
/// Whole-string formats are tried first, then the first calendar-valid
/// `dd.mm.yyyy` found anywhere in the text. Returns `None` rather than failing.
pub fn parse_period_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .or_else(|| find_embedded_date(trimmed))
}

pub fn find_embedded_date(text: &str) -> Option<NaiveDate> {
    EMBEDDED_DATE.captures_iter(text).find_map(|caps| {
        let day = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let year = caps[3].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    })
}
