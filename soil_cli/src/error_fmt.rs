//! Human-readable error descriptions and structured JSON error formatting.

use soil_core::EngineError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(e) = err.downcast_ref::<EngineError>() {
        return match e {
            EngineError::Validation(msg) => format!(
                "What happened: The input was rejected ({msg}).\nHow to fix: Check the grams and timestamp you passed; a reading is either a weight or a watering, not both."
            ),
            EngineError::NotFound(what) => format!(
                "What happened: {what} does not exist.\nHow to fix: Run `soil plant list` or `soil history <plant>` to find the right id."
            ),
            EngineError::History(msg) => format!(
                "What happened: Measurement history could not be read ({msg}).\nLikely causes: Database file missing, locked or corrupted.\nHow to fix: Check the [database] path and file permissions."
            ),
            EngineError::Transaction => {
                "What happened: The write could not be saved and was rolled back.\nLikely causes: Database locked by another process, read-only or out of space.\nHow to fix: Re-run with --log-level=debug for the storage error, then retry.".to_string()
            }
            EngineError::Correction => {
                "What happened: The correction batch failed; no rows were changed.\nLikely causes: Database locked or read-only.\nHow to fix: It is safe to run `soil correct` again.".to_string()
            }
            EngineError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    // String-based heuristics for errors coming from init or import
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("readings csv must have headers") {
        return "Invalid headers in readings CSV. Expected 'measured_at,measured_weight_g,water_added_g,note'.".to_string();
    }

    if lower.starts_with("open database") {
        return format!(
            "What happened: The database could not be opened ({msg}).\nHow to fix: Check --db or [database] path and its directory permissions."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

pub fn reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<EngineError>() {
        Some(EngineError::Validation(_)) => "Validation",
        Some(EngineError::NotFound(_)) => "NotFound",
        Some(EngineError::History(_)) => "History",
        Some(EngineError::Transaction) => "Transaction",
        Some(EngineError::Correction) => "Correction",
        Some(EngineError::Config(_)) => "Config",
        None => "Error",
    }
}

/// Stable exit codes per error kind; anything untyped exits 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<EngineError>() {
        Some(EngineError::Validation(_)) => 2,
        Some(EngineError::NotFound(_)) => 3,
        Some(EngineError::Transaction) => 4,
        Some(EngineError::Correction) => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let detail = match err.downcast_ref::<EngineError>() {
        Some(
            EngineError::Validation(d)
            | EngineError::NotFound(d)
            | EngineError::History(d)
            | EngineError::Config(d),
        ) => Some(d.clone()),
        _ => None,
    };
    let obj = match detail {
        Some(d) => json!({ "reason": reason_name(err), "detail": d, "message": humanize(err) }),
        None => json!({ "reason": reason_name(err), "message": humanize(err) }),
    };
    obj.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_errors_get_stable_codes() {
        let cases = [
            (EngineError::validation("x"), 2, "Validation"),
            (EngineError::NotFound("plant p".into()), 3, "NotFound"),
            (EngineError::Transaction, 4, "Transaction"),
            (EngineError::Correction, 5, "Correction"),
            (EngineError::Config("c".into()), 1, "Config"),
        ];
        for (e, code, name) in cases {
            let report = eyre::Report::new(e);
            assert_eq!(exit_code_for_error(&report), code);
            assert_eq!(reason_name(&report), name);
        }
        assert_eq!(exit_code_for_error(&eyre::eyre!("boom")), 1);
    }

    #[test]
    fn json_carries_detail_for_messages() {
        let report = eyre::Report::new(EngineError::NotFound("plant abc".into()));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&report)).unwrap();
        assert_eq!(v["reason"], "NotFound");
        assert_eq!(v["detail"], "plant abc");
        assert!(v["message"].as_str().unwrap().contains("does not exist"));
    }

    #[test]
    fn csv_header_errors_are_explained() {
        let report = eyre::eyre!("readings CSV must have headers 'x', got: a,b");
        assert!(humanize(&report).starts_with("Invalid headers in readings CSV"));
    }
}
