//! Shared helpers for turning provider payloads into `StandardizedJob` fields.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

use crate::models::job::SalaryRange;

const HOURS_PER_YEAR: f64 = 2080.0;
const ROLE_TERMS: &[&str] = &["engineer", "developer", "architect", "lead", "scientist"];
const TECH_TERMS: &[&str] = &["ai", "ml", "python", "java", "cloud", "rust", "data"];

/// Removes quotes, parentheses and boolean operators, keeps words longer than
/// two characters and caps the result at `max_words`.
///
/// Several job APIs reject or mis-rank boolean queries.
pub fn simplify_query(query: &str, max_words: usize) -> String {
    query
        .chars()
        .filter(|c| !matches!(c, '"' | '(' | ')'))
        .collect::<String>()
        .split_whitespace()
        .filter(|w| !w.eq_ignore_ascii_case("and") && !w.eq_ignore_ascii_case("or"))
        .filter(|w| w.chars().count() > 2)
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keeps role and technology words only. Falls back to [`simplify_query`] when
/// nothing in the query is recognizable.
pub fn focus_query(query: &str, max_words: usize) -> String {
    let simplified = simplify_query(query, usize::MAX);
    let focused: Vec<&str> = simplified
        .split_whitespace()
        .filter(|w| contains_term(w, ROLE_TERMS) || contains_term(w, TECH_TERMS))
        .take(max_words)
        .collect();

    if focused.is_empty() {
        simplify_query(query, max_words)
    } else {
        focused.join(" ")
    }
}

/// True when any alphanumeric token of `text` matches one of `terms`. Short
/// terms (≤ 3 chars, e.g. "ai") must match a whole token.
pub fn contains_term(text: &str, terms: &[&str]) -> bool {
    let lower = text.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|tok| !tok.is_empty())
        .any(|tok| {
            terms
                .iter()
                .any(|t| tok == *t || (t.len() > 3 && tok.contains(t)))
        })
}

/// Builds a salary band from numeric bounds. Non-positive values count as missing.
pub fn salary_from_bounds(
    min: Option<f64>,
    max: Option<f64>,
    currency: &str,
) -> Option<SalaryRange> {
    let positive = |v: Option<f64>| v.filter(|x| x.is_finite() && *x > 0.0);
    let (min, max) = match (positive(min), positive(max)) {
        (Some(a), Some(b)) => (a.min(b), a.max(b)),
        (Some(a), None) | (None, Some(a)) => (a, a),
        (None, None) => return None,
    };
    Some(SalaryRange {
        min,
        max,
        currency: currency.to_string(),
    })
}

/// Parses free-form salary text such as "$80,000 - $120,000", "£45k" or
/// "$40 per hour". Hourly and monthly figures are annualized; a single value
/// becomes a ±10% band.
pub fn parse_salary_text(text: &str) -> Option<SalaryRange> {
    let lower = text.replace(',', "").to_lowercase();

    let currency = if text.contains('£') {
        "GBP"
    } else if text.contains('€') {
        "EUR"
    } else if lower.contains("c$") {
        "CAD"
    } else if lower.contains("a$") {
        "AUD"
    } else {
        "USD"
    };

    let multiplier = if lower.contains("per hour") || lower.contains("/hr") || lower.contains("/hour") {
        HOURS_PER_YEAR
    } else if lower.contains("per month") || lower.contains("/month") {
        12.0
    } else {
        1.0
    };

    let numbers: Vec<f64> = extract_numbers(&lower)
        .into_iter()
        .map(|n| n * multiplier)
        .collect();

    match numbers.as_slice() {
        [] => None,
        [single] => Some(SalaryRange {
            min: single * 0.9,
            max: single * 1.1,
            currency: currency.to_string(),
        }),
        [a, b, ..] => Some(SalaryRange {
            min: a.min(*b),
            max: a.max(*b),
            currency: currency.to_string(),
        }),
    }
}

/// Pulls decimal numbers out of text; a trailing `k` multiplies by 1000.
fn extract_numbers(text: &str) -> Vec<f64> {
    let mut numbers = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_ascii_digit() || (c == '.' && !current.is_empty()) {
            current.push(c);
            continue;
        }
        if !current.is_empty() {
            if let Ok(mut value) = current.trim_end_matches('.').parse::<f64>() {
                if c == 'k' {
                    value *= 1000.0;
                }
                numbers.push(value);
            }
            current.clear();
        }
    }
    if let Ok(value) = current.trim_end_matches('.').parse::<f64>() {
        numbers.push(value);
    }
    numbers
}

/// Parses absolute (RFC 3339, ISO, US and long-form) and relative
/// ("today", "3 days ago") posting dates.
pub fn parse_posted_date(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }

    let lower = raw.to_lowercase();
    if lower.contains("today") || lower.contains("just posted") {
        return Some(today);
    }
    if lower.contains("yesterday") {
        return today.checked_sub_signed(Duration::try_days(1)?);
    }

    let words: Vec<&str> = lower.split_whitespace().collect();
    let ago = words.iter().position(|w| *w == "ago")?;
    if ago < 2 {
        return None;
    }
    let count: i64 = words[ago - 2].parse().ok()?;
    let unit = words[ago - 1].trim_end_matches('s');
    let days = match unit {
        "day" => Some(count),
        "week" => count.checked_mul(7),
        "month" => count.checked_mul(30),
        _ => None,
    }?;
    today.checked_sub_signed(Duration::try_days(days)?)
}

/// "City, ST", either part alone, or `None` when both are blank.
pub fn join_location(city: Option<&str>, region: Option<&str>) -> Option<String> {
    let city = city.map(str::trim).filter(|s| !s.is_empty());
    let region = region.map(str::trim).filter(|s| !s.is_empty());
    match (city, region) {
        (Some(c), Some(r)) => Some(format!("{c}, {r}")),
        (Some(one), None) | (None, Some(one)) => Some(one.to_string()),
        (None, None) => None,
    }
}

/// Lower-case, dash-separated form of a title for synthetic URLs.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn test_simplify_query_strips_boolean_operators() {
        assert_eq!(
            simplify_query(r#""Data Engineer" AND (Spark OR Kafka) in NY"#, 4),
            "Data Engineer Spark Kafka"
        );
    }

    #[test]
    fn test_simplify_query_respects_word_cap() {
        assert_eq!(simplify_query("alpha beta gamma delta", 2), "alpha beta");
    }

    #[test]
    fn test_focus_query_keeps_role_and_tech_terms() {
        assert_eq!(
            focus_query("Senior Software Engineer for Python and Cloud team", 5),
            "Engineer Python Cloud"
        );
    }

    #[test]
    fn test_focus_query_falls_back_when_nothing_matches() {
        assert_eq!(focus_query("Product Manager Fintech", 5), "Product Manager Fintech");
    }

    #[test]
    fn test_contains_term_short_terms_need_whole_token() {
        assert!(contains_term("AI/ML", &["ai"]));
        assert!(!contains_term("Maintenance", &["ai"]));
        assert!(contains_term("Engineering", &["engineer"]));
    }

    #[test]
    fn test_salary_from_bounds_orders_values() {
        let range = salary_from_bounds(Some(120000.0), Some(90000.0), "USD").unwrap();
        assert_eq!(range.min, 90000.0);
        assert_eq!(range.max, 120000.0);
    }

    #[test]
    fn test_salary_from_bounds_ignores_zero() {
        assert!(salary_from_bounds(Some(0.0), Some(0.0), "USD").is_none());
        let range = salary_from_bounds(Some(50000.0), Some(0.0), "GBP").unwrap();
        assert_eq!(range.min, 50000.0);
        assert_eq!(range.max, 50000.0);
        assert_eq!(range.currency, "GBP");
    }

    #[test]
    fn test_parse_salary_text_range() {
        let range = parse_salary_text("$80,000 - $150,000").unwrap();
        assert_eq!(range.min, 80000.0);
        assert_eq!(range.max, 150000.0);
        assert_eq!(range.currency, "USD");
    }

    #[test]
    fn test_parse_salary_text_hourly_is_annualized() {
        let range = parse_salary_text("$50 - $60 per hour").unwrap();
        assert_eq!(range.min, 50.0 * 2080.0);
        assert_eq!(range.max, 60.0 * 2080.0);
    }

    #[test]
    fn test_parse_salary_text_single_value_and_k_suffix() {
        let range = parse_salary_text("£50k").unwrap();
        assert_eq!(range.currency, "GBP");
        assert!((range.min - 45000.0).abs() < 1e-6);
        assert!((range.max - 55000.0).abs() < 1e-6);
    }

    #[test]
    fn test_parse_salary_text_without_numbers() {
        assert!(parse_salary_text("Competitive").is_none());
    }

    #[test]
    fn test_parse_posted_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        assert_eq!(parse_posted_date("2024-05-02T10:00:00Z", today()), Some(expected));
        assert_eq!(parse_posted_date("2024-05-02T10:00:00.000", today()), Some(expected));
        assert_eq!(parse_posted_date("2024-05-02", today()), Some(expected));
        assert_eq!(parse_posted_date("05/02/2024", today()), Some(expected));
        assert_eq!(parse_posted_date("May 02, 2024", today()), Some(expected));
    }

    #[test]
    fn test_parse_posted_date_relative() {
        assert_eq!(parse_posted_date("Today", today()), Some(today()));
        assert_eq!(
            parse_posted_date("posted 3 days ago", today()),
            NaiveDate::from_ymd_opt(2024, 6, 12)
        );
        assert_eq!(
            parse_posted_date("2 weeks ago", today()),
            NaiveDate::from_ymd_opt(2024, 6, 1)
        );
        assert_eq!(parse_posted_date("Recently posted", today()), None);
    }

    #[test]
    fn test_parse_posted_date_out_of_range_is_none() {
        assert_eq!(parse_posted_date("100000000 days ago", today()), None);
        assert_eq!(parse_posted_date("9223372036854775807 weeks ago", today()), None);
        assert_eq!(parse_posted_date("5000000000000000 months ago", today()), None);
        assert_eq!(parse_posted_date("yesterday", NaiveDate::MIN), None);
    }

    #[test]
    fn test_join_location() {
        assert_eq!(
            join_location(Some("Austin"), Some("TX")).as_deref(),
            Some("Austin, TX")
        );
        assert_eq!(join_location(None, Some("TX")).as_deref(), Some("TX"));
        assert_eq!(join_location(Some(" "), None), None);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Senior AI/ML Engineer"), "senior-ai-ml-engineer");
    }
}
