//! Deliverability status normalization tests

use registrar_core::DeliverabilityStatus;

#[test]
fn test_parse_is_case_insensitive() {
    assert_eq!(DeliverabilityStatus::parse("VALID"), DeliverabilityStatus::Valid);
    assert_eq!(DeliverabilityStatus::parse(" Catch-All "), DeliverabilityStatus::CatchAll);
    assert_eq!(DeliverabilityStatus::parse("do_not_mail"), DeliverabilityStatus::DoNotMail);
}

#[test]
fn test_unrecognized_status_is_kept_folded() {
    let status = DeliverabilityStatus::parse("Greylisted");
    assert_eq!(status, DeliverabilityStatus::Other("greylisted".into()));
    assert_eq!(status.as_str(), "greylisted");
}

#[test]
fn test_parse_list() {
    let list = DeliverabilityStatus::parse_list("valid, catch-all,,");
    assert_eq!(
        list,
        vec![DeliverabilityStatus::Valid, DeliverabilityStatus::CatchAll]
    );
}

#[test]
fn test_serde_uses_canonical_strings() {
    let json = serde_json::to_string(&DeliverabilityStatus::CatchAll).unwrap();
    assert_eq!(json, "\"catch-all\"");

    let status: DeliverabilityStatus = serde_json::from_str("\"INVALID\"").unwrap();
    assert_eq!(status, DeliverabilityStatus::Invalid);
}
