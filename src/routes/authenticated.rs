use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Defines the routes accessible to any user who has successfully passed the
/// authentication layer. These are the workflow views: listing a document's
/// workflows, inspecting an instance's transition history, and submitting
/// transitions.
///
/// Access Control Strategy:
/// Every handler in this module relies on the `AuthUser` extractor middleware
/// being present on the router layer above this module. Authentication alone
/// is not sufficient, though: each handler then checks the relevant grant
/// (`workflow_view` or `workflow_transition`) against the target document,
/// with the 'admin' role overriding grant checks.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // Retrieves the currently authenticated user's profile.
        .route("/me", get(handlers::get_me))
        // GET /documents/{document_id}/workflows
        // Lists the workflow instances attached to a document, with their
        // current states. Requires `workflow_view` on the document.
        .route(
            "/documents/{document_id}/workflows",
            get(handlers::get_document_workflows),
        )
        // GET /workflow-instances/{workflow_instance_id}
        // The instance detail: current state plus the transition history,
        // most recent entry first. Requires `workflow_view` on the document.
        .route(
            "/workflow-instances/{workflow_instance_id}",
            get(handlers::get_workflow_instance_detail),
        )
        // GET /workflow-instances/{workflow_instance_id}/transitions
        // The transition choices currently available (form support).
        // Requires `workflow_transition` on the document.
        .route(
            "/workflow-instances/{workflow_instance_id}/transitions",
            get(handlers::get_transition_options),
        )
        // POST /workflow-instances/{workflow_instance_id}/transition
        // Executes a transition: validates it against the current state,
        // appends the log entry and advances the instance atomically.
        .route(
            "/workflow-instances/{workflow_instance_id}/transition",
            post(handlers::submit_transition),
        )
}
