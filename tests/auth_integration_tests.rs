use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use docstate_portal::{
    AppState,
    auth::{AuthUser, Claims},
    config::Env,
    models::{
        AccessGrant, Document, TransitionOption, User, WorkflowDashboardStats, WorkflowInstance,
        WorkflowLogEntry,
    },
    repository::{LaunchError, Repository, TransitionError},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{sync::Arc, time::SystemTime};
use uuid::Uuid;

// --- Mock Repository for Auth Logic ---

// Only `get_user` matters to the extractor; the remaining trait methods are
// inert placeholders so the mock compiles.
#[derive(Default)]
struct MockAuthRepo {
    user_to_return: Option<User>,
}

#[async_trait]
impl Repository for MockAuthRepo {
    async fn get_user(&self, _id: Uuid) -> Option<User> {
        self.user_to_return.clone()
    }

    async fn get_document(&self, _id: Uuid) -> Option<Document> {
        None
    }
    async fn get_document_workflows(&self, _document_id: Uuid) -> Vec<WorkflowInstance> {
        vec![]
    }
    async fn get_workflow_instance(&self, _id: Uuid) -> Option<WorkflowInstance> {
        None
    }
    async fn get_log_entries(&self, _workflow_instance_id: Uuid) -> Vec<WorkflowLogEntry> {
        vec![]
    }
    async fn get_transition_options(&self, _workflow_instance_id: Uuid) -> Vec<TransitionOption> {
        vec![]
    }
    async fn do_transition(
        &self,
        _workflow_instance_id: Uuid,
        _transition_id: Uuid,
        _user_id: Uuid,
        _comment: Option<String>,
    ) -> Result<WorkflowInstance, TransitionError> {
        Err(TransitionError::InstanceNotFound)
    }
    async fn launch_workflow(
        &self,
        _document_id: Uuid,
        _workflow_id: Uuid,
    ) -> Result<WorkflowInstance, LaunchError> {
        Err(LaunchError::DocumentNotFound)
    }
    async fn check_access(&self, _user_id: Uuid, _permission: &str, _document_id: Uuid) -> bool {
        false
    }
    async fn grant_access(
        &self,
        _user_id: Uuid,
        _permission: String,
        _document_id: Option<Uuid>,
    ) -> Option<AccessGrant> {
        None
    }
    async fn get_stats(&self) -> WorkflowDashboardStats {
        WorkflowDashboardStats::default()
    }
}

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
const TEST_USER_ID: Uuid = Uuid::from_u128(1);

fn create_token(user_id: Uuid, exp_offset: u64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs();

    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + exp_offset) as usize, // Token expires in exp_offset seconds
    };

    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn create_app_state(env: Env, repo: MockAuthRepo, jwt_secret: String) -> AppState {
    let mut config = docstate_portal::config::AppConfig::default();
    config.env = env;
    config.jwt_secret = jwt_secret;

    AppState {
        repo: Arc::new(repo),
        config,
    }
}

/// Helper to get the mutable Parts struct from a generated Request
fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

// --- Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let token = create_token(TEST_USER_ID, 3600);

    let mock_repo = MockAuthRepo {
        user_to_return: Some(User {
            id: TEST_USER_ID,
            email: "test@example.com".to_string(),
            role: "staff".to_string(),
        }),
    };

    let app_state = create_app_state(Env::Production, mock_repo, TEST_JWT_SECRET.to_string());

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(auth_user.is_ok());
    let user = auth_user.unwrap();
    assert_eq!(user.id, TEST_USER_ID);
    assert_eq!(user.role, "staff");
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let app_state = create_app_state(
        Env::Production,
        MockAuthRepo::default(),
        TEST_JWT_SECRET.to_string(),
    );

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(auth_user.is_err());
    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_when_user_deleted_after_issue() {
    // A decodable token whose subject no longer resolves to a profile.
    let token = create_token(TEST_USER_ID, 3600);

    let app_state = create_app_state(
        Env::Production,
        MockAuthRepo {
            user_to_return: None,
        },
        TEST_JWT_SECRET.to_string(),
    );

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(auth_user.is_err());
    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_local_bypass_success() {
    let mock_user_id = Uuid::new_v4();
    let mock_repo = MockAuthRepo {
        user_to_return: Some(User {
            id: mock_user_id,
            email: "local@dev.com".to_string(),
            role: "admin".to_string(),
        }),
    };
    let app_state = create_app_state(Env::Local, mock_repo, TEST_JWT_SECRET.to_string());

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&mock_user_id.to_string()).unwrap(),
    );

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(auth_user.is_ok());
    let user = auth_user.unwrap();
    assert_eq!(user.id, mock_user_id);
    assert_eq!(user.role, "admin");
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let mock_user_id = Uuid::new_v4();
    let app_state = create_app_state(
        Env::Production,
        MockAuthRepo::default(),
        TEST_JWT_SECRET.to_string(),
    );

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    // Provide ONLY the local bypass header
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&mock_user_id.to_string()).unwrap(),
    );

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(auth_user.is_err());
    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}
