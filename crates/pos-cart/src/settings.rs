//! Tenant settings parsing and the stamp-duty table.
//!
//! Tenant settings are stored as loosely-typed strings in the settings
//! master and have historically been written by more than one producer, so
//! some rows are valid JSON, some are Python-literal-style (single-quoted),
//! and a few have stray mixed quoting. [`parse_loose_json`] reproduces the
//! exact three-stage fallback a settings value has always been parsed
//! with, so a row that has worked for years keeps working.

use serde::de::DeserializeOwned;

/// Parses a settings value that may be JSON, a Python-literal-style string
/// (single-quoted), or JSON with stray single quotes.
///
/// Tries, in order:
/// 1. Strict JSON.
/// 2. Python-literal style: single quotes swapped for double quotes, plus
///    `True`/`False`/`None` normalised to their JSON equivalents.
/// 3. The same quote swap applied to the raw string as a last resort, in
///    case stage 2's literal normalisation masked an already-valid shape.
///
/// Returns `None` (after logging a warning) if every stage fails, rather
/// than failing the caller's whole operation: a malformed settings row
/// should degrade the feature it configures, not the rest of the request.
pub fn parse_loose_json<T: DeserializeOwned>(raw: &str) -> Option<T> {
    if let Ok(value) = serde_json::from_str(raw) {
        return Some(value);
    }

    let literal_normalised = raw.replace('\'', "\"").replace("True", "true").replace("False", "false").replace("None", "null");
    if let Ok(value) = serde_json::from_str(&literal_normalised) {
        return Some(value);
    }

    let quote_swapped = raw.replace('\'', "\"");
    match serde_json::from_str(&quote_swapped) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(error = %err, raw, "settings value is not parseable as JSON or a loose literal, skipping");
            None
        },
    }
}

/// One row of the stamp-duty table: the threshold and the amount applied
/// once the cash portion of a transaction reaches it.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct StampDutyRule {
    pub target_amount: i64,
    pub stamp_duty_amount: i64,
}

/// Tenant-level cart settings consulted by the finaliser (spec §4.4).
#[derive(Clone, Debug, Default)]
pub struct TenantSettings {
    pub stamp_duty_master: Vec<StampDutyRule>,
    pub invoice_registration_number: Option<String>,
    pub receipt_headers: Vec<String>,
    pub receipt_footers: Vec<String>,
}

/// Finds the first stamp-duty rule whose threshold is met by both the
/// pre-tax total and the cash-only portion of the payments, mirroring the
/// original first-match semantics (rules are evaluated in table order, not
/// sorted by threshold).
#[must_use]
pub fn applicable_stamp_duty(rules: &[StampDutyRule], total_amount_without_tax: i64, cash_amount: i64) -> Option<&StampDutyRule> {
    rules
        .iter()
        .find(|rule| rule.target_amount <= total_amount_without_tax && rule.target_amount <= cash_amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_strict_json() {
        let value: Vec<String> = parse_loose_json(r#"["a","b"]"#).expect("valid json");
        assert_eq!(value, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn parses_python_literal_style_single_quotes() {
        let value: Vec<String> = parse_loose_json("['a', 'b']").expect("loose literal parses");
        assert_eq!(value, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn returns_none_on_unparseable_garbage() {
        let value: Option<Vec<String>> = parse_loose_json("not json at all {{{");
        assert!(value.is_none());
    }

    #[test]
    fn stamp_duty_first_match_wins() {
        let rules = vec![
            StampDutyRule { target_amount: 1_000_000, stamp_duty_amount: 200 },
            StampDutyRule { target_amount: 50_000, stamp_duty_amount: 100 },
        ];
        // Neither total nor cash reaches the first rule's threshold, second rule matches.
        let applicable = applicable_stamp_duty(&rules, 60_000, 60_000);
        assert_eq!(applicable.map(|r| r.stamp_duty_amount), Some(100));
    }

    #[test]
    fn stamp_duty_requires_both_total_and_cash_to_meet_threshold() {
        let rules = vec![StampDutyRule { target_amount: 50_000, stamp_duty_amount: 200 }];
        // Total meets the threshold but cash-only portion doesn't.
        assert!(applicable_stamp_duty(&rules, 60_000, 10_000).is_none());
    }
}
