//! Tests for DefaultValidator

use serde_json::json;
use shelfdb::validation::{DefaultValidator, Validator};
use shelfdb::ShelfError;

fn validator() -> DefaultValidator {
    DefaultValidator::new(32, 16)
}

#[test]
fn test_valid_table_names() {
    let v = validator();
    for name in ["users", "sensor_data", "a", "table-2024", "v1.backup", "CONSOLE", "com10"] {
        v.validate_table_name(name).unwrap();
    }
}

#[test]
fn test_invalid_table_names() {
    let v = validator();
    let long = "x".repeat(33);
    let cases = [
        "",
        long.as_str(),
        "a/b",
        "a\\b",
        "..",
        "a..b",
        ".hidden",
        "nul\0byte",
        "CON",
        "con",
        "nul.txt",
        "Lpt3",
        "COM9.json",
        "users.tmp.123",
    ];

    for name in cases {
        let result = v.validate_table_name(name);
        assert!(
            matches!(result, Err(ShelfError::Validation(_))),
            "expected rejection of {:?}",
            name
        );
    }
}

#[test]
fn test_table_name_length_boundary() {
    let v = validator();
    v.validate_table_name(&"x".repeat(32)).unwrap();
    assert!(v.validate_table_name(&"x".repeat(33)).is_err());
}

#[test]
fn test_keys() {
    let v = validator();
    v.validate_key("k").unwrap();
    v.validate_key("a/b c..d").unwrap();
    v.validate_key(&"k".repeat(16)).unwrap();

    assert!(v.validate_key("").is_err());
    assert!(v.validate_key(&"k".repeat(17)).is_err());
    assert!(v.validate_key("a\0b").is_err());
}

#[test]
fn test_values() {
    let v = validator();
    v.validate_value(&json!(null)).unwrap();
    v.validate_value(&json!({"a": [1, 2.5, "x", true]})).unwrap();
}

#[test]
fn test_errors_are_contract_violations() {
    let err = validator().validate_key("").unwrap_err();
    assert!(err.is_contract_violation());
}
