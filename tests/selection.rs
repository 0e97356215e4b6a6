use labprep::selection::{Selection, DEFAULT_MAX_PRACTICES};
use labprep::LabprepError;
use serde_json::{json, Value};

fn values(v: Value) -> Vec<Value> {
    v.as_array().cloned().unwrap_or_default()
}

#[test]
fn keeps_first_seen_order_without_duplicates() {
    let selection = Selection::new([5, 3, 5, 1, 3], DEFAULT_MAX_PRACTICES).expect("selection");
    assert_eq!(selection.ids(), &[5, 3, 1]);
    assert_eq!(selection.len(), 3);
    assert!(!selection.is_empty());
}

#[test]
fn empty_selection_is_rejected() {
    let err = Selection::new([], DEFAULT_MAX_PRACTICES).unwrap_err();
    assert!(matches!(err, LabprepError::InvalidInput(_)));
}

#[test]
fn oversized_selection_is_rejected_after_deduplication() {
    assert!(Selection::new(1..=3, 3).is_ok());
    assert!(Selection::new([1, 2, 3, 3, 2, 1], 3).is_ok());
    let err = Selection::new(1..=4, 3).unwrap_err();
    match err {
        LabprepError::InvalidInput(message) => assert!(message.contains("at most 3")),
        other => panic!("expected invalid input, got {other:?}"),
    }
}

#[test]
fn parses_integers_and_numeric_strings() {
    let raw = values(json!([1, "2", " 3 ", "abc", null, true, 2.5, {"id": 4}, 1]));
    let selection = Selection::parse(&raw, DEFAULT_MAX_PRACTICES).expect("selection");
    assert_eq!(selection.ids(), &[1, 2, 3]);
}

#[test]
fn nothing_usable_is_rejected() {
    let raw = values(json!(["x", null, 1.5]));
    let err = Selection::parse(&raw, DEFAULT_MAX_PRACTICES).unwrap_err();
    assert!(matches!(err, LabprepError::InvalidInput(_)));

    let err = Selection::parse(&[], DEFAULT_MAX_PRACTICES).unwrap_err();
    assert!(matches!(err, LabprepError::InvalidInput(_)));
}

#[test]
fn negative_identifiers_pass_through_to_lookup() {
    let raw = values(json!([-7, "-8"]));
    let selection = Selection::parse(&raw, DEFAULT_MAX_PRACTICES).expect("selection");
    assert_eq!(selection.ids(), &[-7, -8]);
}
