use crate::models::{
    AccessGrant, Document, TransitionOption, User, WorkflowDashboardStats, WorkflowInstance,
    WorkflowLogEntry,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// TransitionError
///
/// The ways a transition submission can be rejected by the persistence layer.
/// Handlers map these onto HTTP status codes (404 / 400 / 409 / 500).
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("workflow instance not found")]
    InstanceNotFound,
    #[error("transition does not belong to the instance's workflow")]
    UnknownTransition,
    #[error("transition origin does not match the current state")]
    InvalidOrigin,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// LaunchError
///
/// Rejections for attaching a workflow to a document.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("document not found")]
    DocumentNotFound,
    #[error("workflow not found")]
    WorkflowNotFound,
    #[error("workflow has no initial state")]
    MissingInitialState,
    #[error("workflow already launched for this document")]
    AlreadyLaunched,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations. This is the core
/// of the Repository Abstraction pattern, allowing the handlers to interact with
/// the data layer without knowing the specific implementation (Postgres, Mock, etc.).
///
/// **Send + Sync + async_trait** are required to make the trait object (`Arc<dyn Repository>`)
/// safely shareable and usable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Documents & Workflow Retrieval ---
    async fn get_document(&self, id: Uuid) -> Option<Document>;
    // All workflow instances attached to a document, with display labels.
    async fn get_document_workflows(&self, document_id: Uuid) -> Vec<WorkflowInstance>;
    async fn get_workflow_instance(&self, id: Uuid) -> Option<WorkflowInstance>;
    // Transition history, most recent entry first.
    async fn get_log_entries(&self, workflow_instance_id: Uuid) -> Vec<WorkflowLogEntry>;
    // Transitions departing from the instance's current state.
    async fn get_transition_options(&self, workflow_instance_id: Uuid) -> Vec<TransitionOption>;

    // --- Workflow Mutation ---
    // Validates the transition against the current state, appends the log entry
    // and advances the instance, atomically.
    async fn do_transition(
        &self,
        workflow_instance_id: Uuid,
        transition_id: Uuid,
        user_id: Uuid,
        comment: Option<String>,
    ) -> Result<WorkflowInstance, TransitionError>;
    // Creates an instance at the workflow's initial state. One per (document, workflow).
    async fn launch_workflow(
        &self,
        document_id: Uuid,
        workflow_id: Uuid,
    ) -> Result<WorkflowInstance, LaunchError>;

    // --- Access Control ---
    // True when the user holds a grant for the permission, either globally
    // (document_id IS NULL) or scoped to this document. Role overrides are
    // applied by the callers, not here.
    async fn check_access(&self, user_id: Uuid, permission: &str, document_id: Uuid) -> bool;
    async fn grant_access(
        &self,
        user_id: Uuid,
        permission: String,
        document_id: Option<Uuid>,
    ) -> Option<AccessGrant>;

    // --- User/Auth ---
    async fn get_user(&self, id: Uuid) -> Option<User>;
    async fn get_stats(&self) -> WorkflowDashboardStats;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the PostgreSQL database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Shared SELECT for the enriched instance shape; keeps the list, detail and
// mutation paths returning identical rows.
const INSTANCE_SELECT: &str = r#"
    SELECT wi.id, wi.document_id, wi.workflow_id, w.label AS workflow_label,
           wi.current_state_id, s.label AS current_state_label, wi.created_at
    FROM workflow_instances wi
    JOIN workflows w ON wi.workflow_id = w.id
    JOIN workflow_states s ON wi.current_state_id = s.id
"#;

#[async_trait]
impl Repository for PostgresRepository {
    /// get_document
    ///
    /// Simple retrieval by ID. The calling handler turns `None` into a 404.
    async fn get_document(&self, id: Uuid) -> Option<Document> {
        sqlx::query_as::<_, Document>(
            "SELECT id, label, description, created_at FROM documents WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_document error: {:?}", e);
            None
        })
    }

    /// get_document_workflows
    ///
    /// Lists every workflow instance attached to the document, joined with the
    /// workflow and current-state labels the listing displays.
    async fn get_document_workflows(&self, document_id: Uuid) -> Vec<WorkflowInstance> {
        let query = format!("{INSTANCE_SELECT} WHERE wi.document_id = $1 ORDER BY w.label ASC");

        match sqlx::query_as::<_, WorkflowInstance>(&query)
            .bind(document_id)
            .fetch_all(&self.pool)
            .await
        {
            Ok(instances) => instances,
            Err(e) => {
                tracing::error!("get_document_workflows error: {:?}", e);
                vec![]
            }
        }
    }

    async fn get_workflow_instance(&self, id: Uuid) -> Option<WorkflowInstance> {
        let query = format!("{INSTANCE_SELECT} WHERE wi.id = $1");

        sqlx::query_as::<_, WorkflowInstance>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_workflow_instance error: {:?}", e);
                None
            })
    }

    /// get_log_entries
    ///
    /// Retrieves the instance's transition history enriched with the transition
    /// label, the destination state and the acting user's email. The LEFT JOIN
    /// keeps entries readable after their author's profile is gone.
    async fn get_log_entries(&self, workflow_instance_id: Uuid) -> Vec<WorkflowLogEntry> {
        match sqlx::query_as::<_, WorkflowLogEntry>(
            r#"
            SELECT e.id, e.workflow_instance_id, e.transition_id,
                   t.label AS transition_label, d.label AS destination_state_label,
                   e.user_id, p.email AS user_email, e.comment, e.recorded_at
            FROM workflow_instance_log_entries e
            JOIN workflow_transitions t ON e.transition_id = t.id
            JOIN workflow_states d ON t.destination_state_id = d.id
            LEFT JOIN profiles p ON e.user_id = p.id
            WHERE e.workflow_instance_id = $1
            ORDER BY e.recorded_at DESC, e.id DESC
            "#,
        )
        .bind(workflow_instance_id)
        .fetch_all(&self.pool)
        .await
        {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("get_log_entries error: {:?}", e);
                vec![]
            }
        }
    }

    /// get_transition_options
    ///
    /// The choice list for the transition form: transitions of the instance's
    /// workflow whose origin state is the instance's current state.
    async fn get_transition_options(&self, workflow_instance_id: Uuid) -> Vec<TransitionOption> {
        match sqlx::query_as::<_, TransitionOption>(
            r#"
            SELECT t.id, t.label, t.origin_state_id, t.destination_state_id,
                   d.label AS destination_state_label
            FROM workflow_transitions t
            JOIN workflow_states d ON t.destination_state_id = d.id
            JOIN workflow_instances wi ON wi.workflow_id = t.workflow_id
            WHERE wi.id = $1 AND t.origin_state_id = wi.current_state_id
            ORDER BY t.label ASC
            "#,
        )
        .bind(workflow_instance_id)
        .fetch_all(&self.pool)
        .await
        {
            Ok(options) => options,
            Err(e) => {
                tracing::error!("get_transition_options error: {:?}", e);
                vec![]
            }
        }
    }

    /// do_transition
    ///
    /// Executes a transition inside a single transaction: the instance row is
    /// locked, the transition is validated against the workflow and the current
    /// state, then the log entry insert and the state advance commit together.
    async fn do_transition(
        &self,
        workflow_instance_id: Uuid,
        transition_id: Uuid,
        user_id: Uuid,
        comment: Option<String>,
    ) -> Result<WorkflowInstance, TransitionError> {
        let mut tx = self.pool.begin().await?;

        let instance: Option<(Uuid, Uuid)> = sqlx::query_as(
            "SELECT workflow_id, current_state_id FROM workflow_instances WHERE id = $1 FOR UPDATE",
        )
        .bind(workflow_instance_id)
        .fetch_optional(&mut *tx)
        .await?;
        let (workflow_id, current_state_id) =
            instance.ok_or(TransitionError::InstanceNotFound)?;

        let transition: Option<(Uuid, Uuid)> = sqlx::query_as(
            "SELECT origin_state_id, destination_state_id FROM workflow_transitions \
             WHERE id = $1 AND workflow_id = $2",
        )
        .bind(transition_id)
        .bind(workflow_id)
        .fetch_optional(&mut *tx)
        .await?;
        let (origin_state_id, destination_state_id) =
            transition.ok_or(TransitionError::UnknownTransition)?;

        if origin_state_id != current_state_id {
            // Dropping the transaction rolls back the row lock.
            return Err(TransitionError::InvalidOrigin);
        }

        sqlx::query(
            "INSERT INTO workflow_instance_log_entries \
             (workflow_instance_id, transition_id, user_id, comment, recorded_at) \
             VALUES ($1, $2, $3, $4, NOW())",
        )
        .bind(workflow_instance_id)
        .bind(transition_id)
        .bind(user_id)
        .bind(&comment)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE workflow_instances SET current_state_id = $1 WHERE id = $2")
            .bind(destination_state_id)
            .bind(workflow_instance_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_workflow_instance(workflow_instance_id)
            .await
            .ok_or(TransitionError::InstanceNotFound)
    }

    /// launch_workflow
    ///
    /// Attaches a workflow to a document by creating an instance at the
    /// workflow's initial state. `ON CONFLICT DO NOTHING` on the
    /// (document, workflow) unique key makes the operation idempotent; a
    /// conflicting launch surfaces as `AlreadyLaunched`.
    async fn launch_workflow(
        &self,
        document_id: Uuid,
        workflow_id: Uuid,
    ) -> Result<WorkflowInstance, LaunchError> {
        let document_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM documents WHERE id = $1)")
                .bind(document_id)
                .fetch_one(&self.pool)
                .await?;
        if !document_exists {
            return Err(LaunchError::DocumentNotFound);
        }

        let workflow_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM workflows WHERE id = $1)")
                .bind(workflow_id)
                .fetch_one(&self.pool)
                .await?;
        if !workflow_exists {
            return Err(LaunchError::WorkflowNotFound);
        }

        let initial_state: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM workflow_states WHERE workflow_id = $1 AND is_initial = true",
        )
        .bind(workflow_id)
        .fetch_optional(&self.pool)
        .await?;
        let initial_state = initial_state.ok_or(LaunchError::MissingInitialState)?;

        let inserted: Option<Uuid> = sqlx::query_scalar(
            "INSERT INTO workflow_instances (id, document_id, workflow_id, current_state_id, created_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             ON CONFLICT (document_id, workflow_id) DO NOTHING \
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(document_id)
        .bind(workflow_id)
        .bind(initial_state)
        .fetch_optional(&self.pool)
        .await?;
        let instance_id = inserted.ok_or(LaunchError::AlreadyLaunched)?;

        self.get_workflow_instance(instance_id)
            .await
            .ok_or(LaunchError::WorkflowNotFound)
    }

    /// check_access
    ///
    /// A grant matches when it names the permission and is either global
    /// (NULL document) or scoped to the document in question. Database errors
    /// deny access.
    async fn check_access(&self, user_id: Uuid, permission: &str, document_id: Uuid) -> bool {
        let result: Result<bool, sqlx::Error> = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM access_grants
                WHERE user_id = $1 AND permission = $2
                  AND (document_id IS NULL OR document_id = $3)
            )
            "#,
        )
        .bind(user_id)
        .bind(permission)
        .bind(document_id)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(allowed) => allowed,
            Err(e) => {
                tracing::error!("check_access error: {:?}", e);
                false
            }
        }
    }

    /// grant_access
    ///
    /// Records a permission grant. Duplicate grants are harmless for the
    /// EXISTS check, so no uniqueness is enforced here.
    async fn grant_access(
        &self,
        user_id: Uuid,
        permission: String,
        document_id: Option<Uuid>,
    ) -> Option<AccessGrant> {
        let result = sqlx::query_as::<_, AccessGrant>(
            "INSERT INTO access_grants (id, user_id, permission, document_id, created_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             RETURNING id, user_id, permission, document_id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(permission)
        .bind(document_id)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(grant) => Some(grant),
            Err(e) => {
                tracing::error!("grant_access error: {:?}", e);
                None
            }
        }
    }

    /// get_user
    ///
    /// Retrieves user profile data (ID, email, role) needed for authentication and authorization.
    async fn get_user(&self, id: Uuid) -> Option<User> {
        sqlx::query_as::<_, User>("SELECT id, email, role FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or(None)
    }

    /// get_stats
    ///
    /// Compiles all necessary counters for the administrative dashboard in a single call.
    async fn get_stats(&self) -> WorkflowDashboardStats {
        let total_documents = self.count("SELECT COUNT(*) FROM documents").await;
        let total_workflows = self.count("SELECT COUNT(*) FROM workflows").await;
        let total_instances = self.count("SELECT COUNT(*) FROM workflow_instances").await;
        let total_transitions = self
            .count("SELECT COUNT(*) FROM workflow_instance_log_entries")
            .await;

        WorkflowDashboardStats {
            total_documents,
            total_workflows,
            total_instances,
            total_transitions,
        }
    }
}

impl PostgresRepository {
    async fn count(&self, query: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(query)
            .fetch_one(&self.pool)
            .await
            .unwrap_or(0)
    }
}
