//! Structural checks on raw stored blobs

use serde_json::{Map, Value};

static NULL: Value = Value::Null;

fn field<'a>(object: &'a Map<String, Value>, name: &str) -> &'a Value {
    object.get(name).unwrap_or(&NULL)
}

/// Shape checks run after migration and before typed decoding
pub fn validate_structure(value: &Value) -> Result<(), String> {
    let object = value.as_object().ok_or("state is not a JSON object")?;

    if !field(object, "version").is_u64() {
        return Err("version must be a non-negative integer".to_string());
    }
    if !field(object, "expandedKeys").is_array() {
        return Err("expandedKeys must be an array".to_string());
    }
    let selected = field(object, "selectedAssetId");
    if !(selected.is_null() || selected.is_i64()) {
        return Err("selectedAssetId must be null or an integer".to_string());
    }
    if !field(object, "navigationHistory").is_array() {
        return Err("navigationHistory must be an array".to_string());
    }
    if !field(object, "viewPreferences").is_object() {
        return Err("viewPreferences must be an object".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "version": 2,
            "expandedKeys": [],
            "selectedAssetId": null,
            "navigationHistory": [],
            "viewPreferences": {}
        })
    }

    #[test]
    fn test_valid_blob() {
        assert!(validate_structure(&valid()).is_ok());
    }

    #[test]
    fn test_each_field_is_checked() {
        let cases = [
            ("version", json!("2")),
            ("expandedKeys", json!({})),
            ("selectedAssetId", json!("7")),
            ("navigationHistory", json!(null)),
            ("viewPreferences", json!([])),
        ];
        for (field, bad) in cases {
            let mut blob = valid();
            blob[field] = bad;
            let err = validate_structure(&blob).unwrap_err();
            assert!(err.contains(field), "{} -> {}", field, err);
        }
    }

    #[test]
    fn test_missing_selection_counts_as_null() {
        let mut blob = valid();
        blob.as_object_mut().unwrap().remove("selectedAssetId");
        assert!(validate_structure(&blob).is_ok());
    }

    #[test]
    fn test_non_object() {
        assert!(validate_structure(&json!([1, 2])).is_err());
    }
}
