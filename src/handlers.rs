use crate::{
    AppState,
    auth::AuthUser,
    models::{
        self, AccessGrant, AccessGrantRequest, DocumentWorkflowsResponse,
        PERMISSION_WORKFLOW_TRANSITION, PERMISSION_WORKFLOW_VIEW, TransitionOption,
        TransitionRequest, TransitionResponse, UserProfile, WorkflowDashboardStats,
        WorkflowInstance, WorkflowInstanceDetailResponse,
    },
    repository::{LaunchError, TransitionError},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

// --- Authorization Helpers ---

/// ensure_document_access
///
/// The object-level permission gate shared by every workflow handler: the
/// `admin` role passes outright, anyone else needs a matching grant (global
/// or scoped to this document) in the access list.
async fn ensure_document_access(
    state: &AppState,
    user: &AuthUser,
    permission: &str,
    document_id: Uuid,
) -> Result<(), StatusCode> {
    if user.role == "admin" {
        return Ok(());
    }
    if state.repo.check_access(user.id, permission, document_id).await {
        Ok(())
    } else {
        Err(StatusCode::FORBIDDEN)
    }
}

// --- Handlers ---

/// get_document_workflows
///
/// [Authenticated Route] Lists the workflow instances attached to a document,
/// each with its workflow label and current state.
///
/// *Authorization*: requires the `workflow_view` permission on the document.
/// The existence check runs first, so an unknown document is a 404 regardless
/// of the caller's grants.
#[utoipa::path(
    get,
    path = "/documents/{document_id}/workflows",
    params(("document_id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Workflows for the document", body = DocumentWorkflowsResponse),
        (status = 403, description = "Missing workflow_view grant"),
        (status = 404, description = "Document Not Found")
    )
)]
pub async fn get_document_workflows(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentWorkflowsResponse>, StatusCode> {
    let document = state
        .repo
        .get_document(document_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    ensure_document_access(&state, &auth_user, PERMISSION_WORKFLOW_VIEW, document_id).await?;

    let workflows = state.repo.get_document_workflows(document_id).await;
    Ok(Json(DocumentWorkflowsResponse {
        document,
        workflows,
    }))
}

/// get_workflow_instance_detail
///
/// [Authenticated Route] Shows a workflow instance together with its
/// transition history, most recent entry first.
///
/// *Authorization*: `workflow_view` is checked against the instance's
/// **document**, not the instance itself.
#[utoipa::path(
    get,
    path = "/workflow-instances/{workflow_instance_id}",
    params(("workflow_instance_id" = Uuid, Path, description = "Workflow instance ID")),
    responses(
        (status = 200, description = "Instance with history", body = WorkflowInstanceDetailResponse),
        (status = 403, description = "Missing workflow_view grant"),
        (status = 404, description = "Instance Not Found")
    )
)]
pub async fn get_workflow_instance_detail(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(workflow_instance_id): Path<Uuid>,
) -> Result<Json<WorkflowInstanceDetailResponse>, StatusCode> {
    let workflow_instance = state
        .repo
        .get_workflow_instance(workflow_instance_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    ensure_document_access(
        &state,
        &auth_user,
        PERMISSION_WORKFLOW_VIEW,
        workflow_instance.document_id,
    )
    .await?;

    let log_entries = state.repo.get_log_entries(workflow_instance_id).await;
    Ok(Json(WorkflowInstanceDetailResponse {
        workflow_instance,
        log_entries,
    }))
}

/// get_transition_options
///
/// [Authenticated Route] The choice list for the transition form: transitions
/// departing from the instance's current state.
///
/// *Authorization*: gated on `workflow_transition`, the same permission the
/// submission itself requires, so a client never offers choices the user
/// cannot execute.
#[utoipa::path(
    get,
    path = "/workflow-instances/{workflow_instance_id}/transitions",
    params(("workflow_instance_id" = Uuid, Path, description = "Workflow instance ID")),
    responses(
        (status = 200, description = "Available transitions", body = [TransitionOption]),
        (status = 403, description = "Missing workflow_transition grant"),
        (status = 404, description = "Instance Not Found")
    )
)]
pub async fn get_transition_options(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(workflow_instance_id): Path<Uuid>,
) -> Result<Json<Vec<TransitionOption>>, StatusCode> {
    let workflow_instance = state
        .repo
        .get_workflow_instance(workflow_instance_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    ensure_document_access(
        &state,
        &auth_user,
        PERMISSION_WORKFLOW_TRANSITION,
        workflow_instance.document_id,
    )
    .await?;

    let options = state.repo.get_transition_options(workflow_instance_id).await;
    Ok(Json(options))
}

/// submit_transition
///
/// [Authenticated Route] Executes a state transition for a workflow instance.
/// The repository validates the submission (transition belongs to the
/// workflow, origin matches the current state), appends the log entry and
/// advances the state in one transaction.
///
/// Responds with the confirmation message and the advanced instance.
#[utoipa::path(
    post,
    path = "/workflow-instances/{workflow_instance_id}/transition",
    params(("workflow_instance_id" = Uuid, Path, description = "Workflow instance ID")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Transitioned", body = TransitionResponse),
        (status = 400, description = "Transition not part of this workflow"),
        (status = 403, description = "Missing workflow_transition grant"),
        (status = 404, description = "Instance Not Found"),
        (status = 409, description = "Transition does not depart from the current state")
    )
)]
pub async fn submit_transition(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(workflow_instance_id): Path<Uuid>,
    Json(payload): Json<TransitionRequest>,
) -> Result<Json<TransitionResponse>, StatusCode> {
    let workflow_instance = state
        .repo
        .get_workflow_instance(workflow_instance_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    ensure_document_access(
        &state,
        &auth_user,
        PERMISSION_WORKFLOW_TRANSITION,
        workflow_instance.document_id,
    )
    .await?;

    match state
        .repo
        .do_transition(
            workflow_instance_id,
            payload.transition_id,
            auth_user.id,
            payload.comment,
        )
        .await
    {
        Ok(workflow_instance) => {
            // The confirmation names the document, so resolve its label; the
            // raw ID is an acceptable stand-in if the lookup fails mid-flight.
            let document_label = state
                .repo
                .get_document(workflow_instance.document_id)
                .await
                .map(|d| d.label)
                .unwrap_or_else(|| workflow_instance.document_id.to_string());

            Ok(Json(TransitionResponse {
                message: format!("Document \"{}\" transitioned successfully", document_label),
                workflow_instance,
            }))
        }
        Err(TransitionError::InstanceNotFound) => Err(StatusCode::NOT_FOUND),
        Err(TransitionError::UnknownTransition) => Err(StatusCode::BAD_REQUEST),
        Err(TransitionError::InvalidOrigin) => Err(StatusCode::CONFLICT),
        Err(TransitionError::Database(e)) => {
            tracing::error!("submit_transition error: {:?}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// get_me
///
/// [Authenticated Route] Provides the authenticated user's profile information.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, StatusCode> {
    // AuthUser already proved the profile exists; a miss here means it was
    // deleted between the extractor lookup and now.
    let user = state
        .repo
        .get_user(id)
        .await
        .ok_or(StatusCode::UNAUTHORIZED)?;

    Ok(Json(UserProfile {
        id: user.id,
        email: user.email,
        role: user.role,
    }))
}

/// get_admin_stats
///
/// [Admin Route] Retrieves core application statistics for the dashboard.
///
/// *Authorization*: Explicitly checks that the `role` is "admin".
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses((status = 200, description = "Stats", body = WorkflowDashboardStats))
)]
pub async fn get_admin_stats(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<WorkflowDashboardStats>, StatusCode> {
    if role != "admin" {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(state.repo.get_stats().await))
}

/// grant_access
///
/// [Admin Route] Grants a workflow permission to a user, either globally or
/// scoped to one document.
#[utoipa::path(
    post,
    path = "/admin/access-grants",
    request_body = AccessGrantRequest,
    responses(
        (status = 201, description = "Granted", body = AccessGrant),
        (status = 400, description = "Unknown permission"),
        (status = 403, description = "Not Admin")
    )
)]
pub async fn grant_access(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<AccessGrantRequest>,
) -> Result<(StatusCode, Json<AccessGrant>), StatusCode> {
    if role != "admin" {
        return Err(StatusCode::FORBIDDEN);
    }
    // Only the two workflow permissions exist; reject typos early instead of
    // storing grants nothing will ever match.
    if payload.permission != PERMISSION_WORKFLOW_VIEW
        && payload.permission != PERMISSION_WORKFLOW_TRANSITION
    {
        return Err(StatusCode::BAD_REQUEST);
    }

    match state
        .repo
        .grant_access(payload.user_id, payload.permission, payload.document_id)
        .await
    {
        Some(grant) => Ok((StatusCode::CREATED, Json(grant))),
        None => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// launch_workflow
///
/// [Admin Route] Attaches a workflow to a document, creating an instance at
/// the workflow's initial state.
///
/// *Idempotency*: the unique (document, workflow) key turns a repeated launch
/// into a 409 Conflict rather than a duplicate instance.
#[utoipa::path(
    post,
    path = "/admin/documents/{document_id}/workflows/{workflow_id}",
    params(
        ("document_id" = Uuid, Path, description = "Document ID"),
        ("workflow_id" = Uuid, Path, description = "Workflow ID")
    ),
    responses(
        (status = 201, description = "Launched", body = WorkflowInstance),
        (status = 403, description = "Not Admin"),
        (status = 404, description = "Document or Workflow Not Found"),
        (status = 409, description = "Already launched"),
        (status = 422, description = "Workflow has no initial state")
    )
)]
pub async fn launch_workflow(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
    Path((document_id, workflow_id)): Path<(Uuid, Uuid)>,
) -> Result<(StatusCode, Json<models::WorkflowInstance>), StatusCode> {
    if role != "admin" {
        return Err(StatusCode::FORBIDDEN);
    }

    match state.repo.launch_workflow(document_id, workflow_id).await {
        Ok(instance) => Ok((StatusCode::CREATED, Json(instance))),
        Err(LaunchError::DocumentNotFound) | Err(LaunchError::WorkflowNotFound) => {
            Err(StatusCode::NOT_FOUND)
        }
        Err(LaunchError::MissingInitialState) => Err(StatusCode::UNPROCESSABLE_ENTITY),
        Err(LaunchError::AlreadyLaunched) => Err(StatusCode::CONFLICT),
        Err(LaunchError::Database(e)) => {
            tracing::error!("launch_workflow error: {:?}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
