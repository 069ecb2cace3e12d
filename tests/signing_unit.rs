use serde_json::json;

use subgate::acquirer::{format_amount, is_paid_response, sign_order, sign_status};

#[test]
fn whole_amount_keeps_decimal_point() {
    assert_eq!(format_amount(1900.0), "1900.0");
    assert_eq!(format_amount(8000.0), "8000.0");
}

#[test]
fn fractional_amount_passes_through() {
    assert_eq!(format_amount(199.5), "199.5");
    assert_eq!(format_amount(21.11), "21.11");
}

#[test]
fn order_signature_matches_reference_digest() {
    // md5("42:s3cret:1900.0:PAY_1_1000")
    assert_eq!(
        sign_order(42, "s3cret", 1900.0, "PAY_1_1000"),
        "d031d6a2f4eba90ec92828b408eb68ea"
    );
}

#[test]
fn status_signature_matches_reference_digest() {
    // md5("42:s3cret:ext-55")
    assert_eq!(
        sign_status(42, "s3cret", "ext-55"),
        "e60ed789b76487abec536ed27aff8eef"
    );
}

#[test]
fn order_signature_depends_on_amount_formatting() {
    assert_ne!(
        sign_order(42, "s3cret", 1900.0, "PAY_1_1000"),
        sign_order(42, "s3cret", 1900.5, "PAY_1_1000")
    );
}

#[test]
fn numeric_status_one_is_paid() {
    assert!(is_paid_response(&json!({"status": 1})));
    assert!(!is_paid_response(&json!({"status": 2})));
    assert!(!is_paid_response(&json!({"status": 0})));
}

#[test]
fn boolean_paid_flag_is_paid() {
    assert!(is_paid_response(&json!({"paid": true})));
    assert!(!is_paid_response(&json!({"paid": false})));
}

#[test]
fn string_statuses_are_recognized() {
    assert!(is_paid_response(&json!({"status": "success"})));
    assert!(is_paid_response(&json!({"status": "paid"})));
    assert!(is_paid_response(&json!({"status": "completed"})));
    assert!(is_paid_response(&json!({"state": "completed"})));
    assert!(!is_paid_response(&json!({"status": "pending"})));
    assert!(!is_paid_response(&json!({"status": "SUCCESS"})));
}

#[test]
fn empty_response_is_not_paid() {
    assert!(!is_paid_response(&json!({})));
    assert!(!is_paid_response(&json!({"message": "ok"})));
}
