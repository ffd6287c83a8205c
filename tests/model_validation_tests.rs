use docstate_portal::models::{
    AccessGrantRequest, TransitionRequest, WorkflowDashboardStats, WorkflowLogEntry,
};
use uuid::Uuid;

// --- Tests ---

#[test]
fn test_transition_request_comment_is_optional() {
    // The transition form's comment field is optional; a payload without it
    // must deserialize with `comment: None` rather than erroring.
    let payload = format!(r#"{{"transition_id":"{}"}}"#, Uuid::from_u128(42));

    let request: TransitionRequest =
        serde_json::from_str(&payload).expect("payload without comment should deserialize");

    assert_eq!(request.transition_id, Uuid::from_u128(42));
    assert!(request.comment.is_none());
}

#[test]
fn test_access_grant_request_defaults_to_global_scope() {
    // A grant request with no document_id means a global grant.
    let payload = format!(
        r#"{{"user_id":"{}","permission":"workflow_view"}}"#,
        Uuid::from_u128(1)
    );

    let request: AccessGrantRequest = serde_json::from_str(&payload).unwrap();

    assert_eq!(request.permission, "workflow_view");
    assert!(request.document_id.is_none());
}

#[test]
fn test_log_entry_serializes_display_fields() {
    // The history payload must carry the JOINed display fields under their
    // own names; clients render these directly.
    let entry = WorkflowLogEntry {
        id: 1,
        transition_label: "Submit for review".to_string(),
        destination_state_label: "In review".to_string(),
        user_email: Some("clerk@example.com".to_string()),
        comment: None,
        ..WorkflowLogEntry::default()
    };

    let json_output = serde_json::to_string(&entry).unwrap();

    assert!(json_output.contains(r#""transition_label":"Submit for review""#));
    assert!(json_output.contains(r#""destination_state_label":"In review""#));
    // Absent comment serializes as an explicit null, not a missing key.
    assert!(json_output.contains(r#""comment":null"#));
}

#[test]
fn test_dashboard_stats_default_is_zeroed() {
    let stats = WorkflowDashboardStats::default();
    assert_eq!(stats.total_documents, 0);
    assert_eq!(stats.total_transitions, 0);
}
