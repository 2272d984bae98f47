use crate::wizard::state::STATE_VERSION;
use serde_json::Value;

// Persisted records carry a schema version; anything that is not the current
// version goes through `upgrade` before structured decoding.

const LEGACY_SET_KEYS: [(&str, &str); 4] = [
    ("selectedCssFrameworks", "cssFrameworks"),
    ("selectedJsFrameworks", "jsFrameworks"),
    ("selectedAgents", "agents"),
    ("selectedEditors", "editors"),
];

const FLAG_KEYS: [&str; 3] = ["framework", "frameworkDocs", "frameworkExamples"];

pub fn needs_migration(value: &Value) -> bool {
    value
        .get("version")
        .and_then(Value::as_str)
        .map(|version| version != STATE_VERSION)
        .unwrap_or(true)
}

pub fn upgrade(value: Value) -> Value {
    let Value::Object(mut record) = value else {
        return value;
    };

    for (legacy, current) in LEGACY_SET_KEYS {
        if let Some(values) = record.remove(legacy) {
            record.entry(current).or_insert(values);
        }
    }

    // Early records serialized booleans as the strings "true"/"false".
    for key in FLAG_KEYS {
        if let Some(Value::String(raw)) = record.get(key) {
            let coerced = raw.trim().eq_ignore_ascii_case("true");
            record.insert(key.to_string(), Value::Bool(coerced));
        }
    }

    if let Some(Value::Array(raw_steps)) = record.get("completedSteps") {
        let steps: Vec<u64> = raw_steps
            .iter()
            .filter_map(|step| match step {
                Value::Number(number) => number.as_u64(),
                Value::String(raw) => raw.trim().parse().ok(),
                _ => None,
            })
            .collect();
        record.insert(
            "completedSteps".to_string(),
            Value::Array(steps.iter().map(|step| Value::from(*step)).collect()),
        );
        let current_step_missing = !matches!(record.get("currentStep"), Some(Value::Number(_)));
        if current_step_missing {
            let derived = steps.iter().max().map(|max| max + 1).unwrap_or(1);
            record.insert("currentStep".to_string(), Value::from(derived));
        }
    }

    record.insert(
        "version".to_string(),
        Value::String(STATE_VERSION.to_string()),
    );
    Value::Object(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_string_booleans_become_real_booleans() {
        let upgraded = upgrade(json!({
            "setupType": "custom",
            "version": "1",
            "framework": "true",
            "frameworkDocs": "false",
        }));
        assert_eq!(upgraded["framework"], json!(true));
        assert_eq!(upgraded["frameworkDocs"], json!(false));
        assert_eq!(upgraded["version"], json!(STATE_VERSION));
    }

    #[test]
    fn current_step_is_rederived_from_completed_steps() {
        let upgraded = upgrade(json!({
            "setupType": "simple",
            "version": "1",
            "completedSteps": [1, 2],
        }));
        assert_eq!(upgraded["currentStep"], json!(3));
    }

    #[test]
    fn present_current_step_is_left_alone() {
        let upgraded = upgrade(json!({
            "setupType": "simple",
            "version": "1",
            "completedSteps": [1],
            "currentStep": 1,
        }));
        assert_eq!(upgraded["currentStep"], json!(1));
    }

    #[test]
    fn legacy_set_key_spellings_are_renamed() {
        let upgraded = upgrade(json!({
            "setupType": "custom",
            "version": "1",
            "selectedEditors": ["cursor", "claude"],
        }));
        assert_eq!(upgraded["editors"], json!(["cursor", "claude"]));
        assert!(upgraded.get("selectedEditors").is_none());
    }

    #[test]
    fn records_without_a_version_are_treated_as_legacy() {
        assert!(needs_migration(&json!({"setupType": "simple"})));
        assert!(!needs_migration(
            &json!({"setupType": "simple", "version": STATE_VERSION})
        ));
    }
}
