use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// Defines the routes exclusively accessible to users with the 'admin' role:
/// provisioning (launching workflows onto documents, granting permissions)
/// and oversight (dashboard statistics).
///
/// Access Control:
/// The handlers behind this router authenticate via the `AuthUser` extractor
/// and then explicitly check for the `role='admin'` permission before doing
/// any work. This prevents unauthorized access to provisioning functions.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/stats
        // Retrieves core dashboard metrics (documents, workflows, instances,
        // executed transitions).
        .route("/stats", get(handlers::get_admin_stats))
        // POST /admin/access-grants
        // Grants `workflow_view` / `workflow_transition` to a user, globally
        // or scoped to a single document.
        .route("/access-grants", post(handlers::grant_access))
        // POST /admin/documents/{document_id}/workflows/{workflow_id}
        // Launches a workflow on a document: creates the instance at the
        // workflow's initial state. Conflicts (already launched) return 409.
        .route(
            "/documents/{document_id}/workflows/{workflow_id}",
            post(handlers::launch_workflow),
        )
}
