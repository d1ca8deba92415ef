use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::{Role, UserStatus};
use reqwest::Client;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::{Value, json};
use tempfile::TempDir;

use server::config::{
    AppConfig, AuthConfig, CorsConfig, DatabaseConfig, MailerConfig, ServerConfig,
};
use server::entity::user;
use server::mailer::{Email, MailError, Mailer};
use server::state::AppState;

pub mod routes {
    pub const REGISTER: &str = "/api/v1/auth/register";
    pub const VERIFY: &str = "/api/v1/auth/verify";
    pub const FORGOT_PASSWORD: &str = "/api/v1/auth/password/forgot";
    pub const RESET_PASSWORD: &str = "/api/v1/auth/password/reset";
    pub const LOGIN: &str = "/api/v1/auth/login";
    pub const LOGOUT: &str = "/api/v1/auth/logout";
    pub const ACCOUNT: &str = "/api/v1/account";
    pub const RECERTIFY: &str = "/api/v1/account/recertify";
    pub const AGENCIES: &str = "/api/v1/agencies";
    pub const DOCUMENTS: &str = "/api/v1/documents";
    pub const CHALLENGES: &str = "/api/v1/challenges";
    pub const PUBLIC_CHALLENGES: &str = "/api/v1/challenges/public";
    pub const WIZARD: &str = "/api/v1/challenges/wizard";
    pub const SUBMISSIONS: &str = "/api/v1/submissions";
    pub const ADMIN_USERS: &str = "/api/v1/admin/users";
    pub const ADMIN_DASHBOARD: &str = "/api/v1/admin/dashboard";
    pub const ADMIN_CERTIFICATIONS: &str = "/api/v1/admin/certifications";
    pub const SECURITY_LOG: &str = "/api/v1/admin/logs/security";
    pub const CERTIFICATION_LOG: &str = "/api/v1/admin/logs/certifications";

    pub fn challenge(id: i32) -> String {
        format!("/api/v1/challenges/{id}")
    }

    pub fn public_challenge(id: i32) -> String {
        format!("/api/v1/challenges/public/{id}")
    }

    pub fn transitions(id: i32) -> String {
        format!("/api/v1/challenges/{id}/transitions")
    }

    pub fn owners(id: i32) -> String {
        format!("/api/v1/challenges/{id}/owners")
    }

    pub fn owner(id: i32, user_id: i32) -> String {
        format!("/api/v1/challenges/{id}/owners/{user_id}")
    }

    pub fn challenge_documents(id: i32) -> String {
        format!("/api/v1/challenges/{id}/documents")
    }

    pub fn timeline(id: i32) -> String {
        format!("/api/v1/challenges/{id}/timeline")
    }

    pub fn wizard(id: i32) -> String {
        format!("/api/v1/challenges/{id}/wizard")
    }

    pub fn wizard_section(id: i32, section: &str) -> String {
        format!("/api/v1/challenges/{id}/wizard/{section}")
    }

    pub fn exports(id: i32) -> String {
        format!("/api/v1/challenges/{id}/exports")
    }

    pub fn export(id: i32, export_id: i32) -> String {
        format!("/api/v1/challenges/{id}/exports/{export_id}")
    }

    pub fn submission(id: i32) -> String {
        format!("/api/v1/submissions/{id}")
    }

    pub fn submit(id: i32) -> String {
        format!("/api/v1/submissions/{id}/submit")
    }

    pub fn verify_submission(id: i32) -> String {
        format!("/api/v1/submissions/{id}/verify")
    }

    pub fn judging(id: i32) -> String {
        format!("/api/v1/submissions/{id}/judging")
    }

    pub fn user_role(id: i32) -> String {
        format!("/api/v1/admin/users/{id}/role")
    }

    pub fn user_status(id: i32) -> String {
        format!("/api/v1/admin/users/{id}/status")
    }

    pub fn certification(user_id: i32) -> String {
        format!("/api/v1/admin/certifications/{user_id}")
    }
}

pub const PASSWORD: &str = "correct-horse-battery";

/// Mailer that keeps every delivered message for assertions.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Email>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn deliver(&self, email: &Email) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

impl RecordingMailer {
    pub fn sent_to(&self, to: &str) -> Vec<Email> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.to == to)
            .cloned()
            .collect()
    }
}

/// A running test server backed by its own SQLite file.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub mailer: Arc<RecordingMailer>,
    _dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
}

/// A signed-in account.
pub struct TestUser {
    pub id: i32,
    pub email: String,
    pub token: String,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let db = server::database::init_db(&db_url)
            .await
            .expect("Failed to initialize test database");
        server::seed::seed_role_permissions(&db)
            .await
            .expect("Failed to seed role permissions");

        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig { url: db_url },
            auth: AuthConfig {
                jwt_secret: "test-secret-for-integration-tests".to_string(),
                token_ttl_days: 7,
                reset_token_ttl_minutes: 60,
            },
            mailer: MailerConfig {
                from_address: "team@challenge.gov".to_string(),
                base_url: "http://localhost:4000".to_string(),
            },
        };

        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState {
            db: db.clone(),
            config,
            mailer: mailer.clone(),
        };
        let app = server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            mailer,
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn send(&self, req: reqwest::RequestBuilder, token: Option<&str>) -> TestResponse {
        let req = match token {
            Some(token) => req.header("Authorization", format!("Bearer {token}")),
            None => req,
        };
        let res = req.send().await.expect("Failed to send request");
        TestResponse::from_response(res).await
    }

    pub async fn post_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        self.send(self.client.post(self.url(path)).json(body), Some(token))
            .await
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        self.send(self.client.post(self.url(path)).json(body), None)
            .await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        self.send(self.client.get(self.url(path)), Some(token)).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        self.send(self.client.get(self.url(path)), None).await
    }

    pub async fn patch_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        self.send(self.client.patch(self.url(path)).json(body), Some(token))
            .await
    }

    pub async fn put_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        self.send(self.client.put(self.url(path)).json(body), Some(token))
            .await
    }

    pub async fn delete_with_token(&self, path: &str, token: &str) -> TestResponse {
        self.send(self.client.delete(self.url(path)), Some(token))
            .await
    }

    /// Register through the API and return the new account's id.
    pub async fn register(&self, email: &str, role: &str) -> i32 {
        let res = self
            .post_without_token(
                routes::REGISTER,
                &json!({
                    "email": email,
                    "password": PASSWORD,
                    "first_name": "Test",
                    "last_name": "User",
                    "role": role,
                    "terms_accepted": true,
                }),
            )
            .await;
        assert_eq!(res.status, 201, "Registration failed: {}", res.text);
        res.id()
    }

    pub async fn login(&self, email: &str) -> TestResponse {
        self.post_without_token(
            routes::LOGIN,
            &json!({"email": email, "password": PASSWORD}),
        )
        .await
    }

    /// Register, then force the role and status, verify the email and sign in.
    pub async fn create_user(&self, email: &str, role: Role) -> TestUser {
        let registered_as = if role == Role::ChallengeOwner {
            "challenge_owner"
        } else {
            "solver"
        };
        let id = self.register(email, registered_as).await;

        let db_user = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .expect("DB query failed")
            .expect("User not found after registration");
        let mut active: user::ActiveModel = db_user.into();
        active.role = Set(role);
        active.status = Set(UserStatus::Active);
        active.email_verified_at = Set(Some(Utc::now()));
        active.email_verification_token = Set(None);
        active.update(&self.db).await.expect("Failed to update user");

        let res = self.login(email).await;
        assert_eq!(res.status, 200, "Login failed: {}", res.text);
        TestUser {
            id,
            email: email.to_string(),
            token: res.body["token"]
                .as_str()
                .expect("Login response should contain a token")
                .to_string(),
        }
    }

    pub async fn find_user(&self, email: &str) -> user::Model {
        user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .expect("DB query failed")
            .expect("User not found")
    }

    /// Wait for the background mailer to deliver a message to `to` whose subject contains `subject`.
    pub async fn wait_for_email(&self, to: &str, subject: &str) -> Email {
        for _ in 0..100 {
            if let Some(email) = self
                .mailer
                .sent_to(to)
                .into_iter()
                .find(|e| e.subject.contains(subject))
            {
                return email;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("No email to {to} with subject containing {subject:?}");
    }

    pub async fn create_agency(&self, admin: &TestUser, name: &str) -> i32 {
        let res = self
            .post_with_token(routes::AGENCIES, &json!({"name": name}), &admin.token)
            .await;
        assert_eq!(res.status, 201, "create_agency failed: {}", res.text);
        res.id()
    }

    pub async fn create_document(&self, user: &TestUser, filename: &str) -> i32 {
        let res = self
            .post_with_token(routes::DOCUMENTS, &json!({"filename": filename}), &user.token)
            .await;
        assert_eq!(res.status, 201, "create_document failed: {}", res.text);
        res.id()
    }

    /// Create a challenge with every section filled in, as a draft.
    pub async fn create_complete_challenge(&self, creator: &TestUser, agency_id: i32) -> Value {
        let res = self
            .post_with_token(
                routes::CHALLENGES,
                &complete_challenge(agency_id, "Clean water"),
                &creator.token,
            )
            .await;
        assert_eq!(res.status, 201, "create challenge failed: {}", res.text);
        res.body
    }

    pub async fn transition(
        &self,
        user: &TestUser,
        challenge_id: i32,
        body: Value,
    ) -> TestResponse {
        self.post_with_token(&routes::transitions(challenge_id), &body, &user.token)
            .await
    }

    /// A published challenge with one open phase; returns `(challenge_id, phase_id)`.
    pub async fn published_challenge(&self, admin: &TestUser) -> (i32, i32) {
        let agency_id = self.create_agency(admin, "Environmental Protection Agency").await;
        let challenge = self.create_complete_challenge(admin, agency_id).await;
        let id = challenge["id"].as_i64().unwrap() as i32;
        let res = self.transition(admin, id, json!({"action": "publish"})).await;
        assert_eq!(res.status, 200, "publish failed: {}", res.text);
        assert_eq!(res.body["status"], "created");
        let phase_id = challenge["phases"][0]["id"].as_i64().unwrap() as i32;
        (id, phase_id)
    }

    /// A draft submission with every required field; returns its id.
    pub async fn create_submission(
        &self,
        solver: &TestUser,
        challenge_id: i32,
        phase_id: i32,
        title: &str,
    ) -> i32 {
        let res = self
            .post_with_token(
                routes::SUBMISSIONS,
                &json!({
                    "challenge_id": challenge_id,
                    "phase_id": phase_id,
                    "title": title,
                    "brief_description": "A filter that works",
                    "terms_accepted": true,
                }),
                &solver.token,
            )
            .await;
        assert_eq!(res.status, 201, "create_submission failed: {}", res.text);
        res.id()
    }
}

/// Every section of a challenge, valid under strict validation.
pub fn complete_challenge(agency_id: i32, title: &str) -> Value {
    let start = Utc::now() - chrono::Duration::days(1);
    let end = Utc::now() + chrono::Duration::days(30);
    json!({
        "title": title,
        "agency_id": agency_id,
        "tagline": "Test the water",
        "brief_description": "Find better filters",
        "description": "A longer description of the challenge.",
        "phases": [{
            "title": "Phase 1",
            "start_date": start.to_rfc3339(),
            "end_date": end.to_rfc3339(),
            "open_to_submissions": true,
        }],
        "prize_total": 100000,
        "eligibility_requirements": "US residents",
        "terms_and_conditions": "Standard terms",
        "judging_criteria": "Impact",
        "how_to_enter": "Submit online",
    })
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let header = |name: reqwest::header::HeaderName| {
            res.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(reqwest::header::CONTENT_TYPE);
        let content_disposition = header(reqwest::header::CONTENT_DISPOSITION);
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            text,
            body,
            content_type,
            content_disposition,
        }
    }

    pub fn id(&self) -> i32 {
        self.body["id"]
            .as_i64()
            .expect("response body should contain 'id'") as i32
    }
}
