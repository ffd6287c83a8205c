use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Permission Vocabulary ---

/// Grants read access to a document's workflows and their transition history.
pub const PERMISSION_WORKFLOW_VIEW: &str = "workflow_view";

/// Grants the right to submit state transitions for workflow instances
/// attached to a document.
pub const PERMISSION_WORKFLOW_TRANSITION: &str = "workflow_transition";

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Represents the user's canonical identity record stored in the `public.profiles` table.
/// This structure includes the minimal required data resolved during authentication.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    // Primary Key, also the subject (`sub`) carried in the JWT.
    pub id: Uuid,
    // The user's primary identifier.
    pub email: String,
    // The RBAC field: 'staff' or 'admin'.
    pub role: String,
}

/// Document
///
/// A document record from the `public.documents` table. Workflow instances
/// attach to documents, and every workflow permission is checked against the
/// owning document rather than the instance itself.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Document {
    pub id: Uuid,
    pub label: String,
    pub description: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// WorkflowInstance
///
/// A running instantiation of a workflow attached to a single document,
/// joined with the workflow and current-state labels for display.
/// One instance exists per (document, workflow) pair.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct WorkflowInstance {
    pub id: Uuid,
    pub document_id: Uuid,
    pub workflow_id: Uuid,
    // Loaded via a JOIN with `workflows` in the repository query.
    pub workflow_label: String,
    pub current_state_id: Uuid,
    // Loaded via a JOIN with `workflow_states`.
    pub current_state_label: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// WorkflowLogEntry
///
/// One row of a workflow instance's transition history, from the
/// `public.workflow_instance_log_entries` table. The log is append-only:
/// an entry is written exactly once, together with the state advance it records.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct WorkflowLogEntry {
    // BigInt (i64) key; history tables grow without bound.
    pub id: i64,
    pub workflow_instance_id: Uuid,
    pub transition_id: Uuid,
    // JOINed display fields: which transition fired and where it landed.
    pub transition_label: String,
    pub destination_state_label: String,
    pub user_id: Uuid,
    // The acting user's email, resolved through `profiles`. NULL once the
    // profile has been removed.
    #[sqlx(default)]
    pub user_email: Option<String>,
    pub comment: Option<String>,
    #[ts(type = "string")]
    pub recorded_at: DateTime<Utc>,
}

/// TransitionOption
///
/// A transition currently available to a workflow instance: one whose origin
/// state matches the instance's current state. This is the choice list a
/// client renders when offering the transition form.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct TransitionOption {
    pub id: Uuid,
    pub label: String,
    pub origin_state_id: Uuid,
    pub destination_state_id: Uuid,
    pub destination_state_label: String,
}

/// --- Request Payloads (Input Schemas) ---

/// TransitionRequest
///
/// Input payload for submitting a state transition
/// (POST /workflow-instances/{id}/transition).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TransitionRequest {
    /// The transition to execute. Must belong to the instance's workflow and
    /// depart from its current state.
    pub transition_id: Uuid,
    /// Optional free-text note recorded on the log entry.
    #[serde(default)]
    pub comment: Option<String>,
}

/// AccessGrantRequest
///
/// Input payload for the admin grant endpoint (POST /admin/access-grants).
/// A missing `document_id` grants the permission globally.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AccessGrantRequest {
    pub user_id: Uuid,
    /// One of `workflow_view` or `workflow_transition`.
    #[schema(example = "workflow_view")]
    pub permission: String,
    #[serde(default)]
    pub document_id: Option<Uuid>,
}

/// --- Response Schemas (Output) ---

/// DocumentWorkflowsResponse
///
/// Output of the document workflow listing: the document itself plus every
/// workflow instance currently attached to it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DocumentWorkflowsResponse {
    pub document: Document,
    pub workflows: Vec<WorkflowInstance>,
}

/// WorkflowInstanceDetailResponse
///
/// Output of the instance detail view: the instance with its current state,
/// and the transition history ordered most recent first.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct WorkflowInstanceDetailResponse {
    pub workflow_instance: WorkflowInstance,
    pub log_entries: Vec<WorkflowLogEntry>,
}

/// TransitionResponse
///
/// Output of a successful transition submission. Carries the human-readable
/// confirmation message alongside the advanced instance.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TransitionResponse {
    pub message: String,
    pub workflow_instance: WorkflowInstance,
}

/// AccessGrant
///
/// A persisted permission grant from the `public.access_grants` table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct AccessGrant {
    pub id: Uuid,
    pub user_id: Uuid,
    pub permission: String,
    pub document_id: Option<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// --- Dashboard & Profile Schemas (Output) ---

/// WorkflowDashboardStats
///
/// Output schema for the administrative statistics dashboard (GET /admin/stats).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct WorkflowDashboardStats {
    pub total_documents: i64,
    pub total_workflows: i64,
    pub total_instances: i64,
    /// The number of log entries, i.e. transitions executed across all instances.
    pub total_transitions: i64,
}

/// UserProfile
///
/// Output schema for the authenticated user's profile (GET /me).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}
