use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;

use server::entity::security_log::{self, SecurityAction};

use crate::common::{PASSWORD, TestApp, routes};

/// The token carried in a verification or reset email body.
fn token_from(body: &str) -> String {
    body.split("token: ")
        .nth(1)
        .and_then(|rest| rest.lines().next())
        .expect("email should contain a token")
        .trim()
        .to_string()
}

mod registration {
    use super::*;

    #[tokio::test]
    async fn solver_registers_active_and_receives_a_verification_email() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({
                    "email": "Ada@Example.com",
                    "password": PASSWORD,
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "terms_accepted": true,
                }),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["email"], "ada@example.com");
        assert_eq!(res.body["role"], "solver");
        assert_eq!(res.body["status"], "active");
        assert!(res.body["email_verified_at"].is_null());

        let email = app
            .wait_for_email("ada@example.com", "Verify your ChallengeGov account")
            .await;
        assert!(!token_from(&email.body).is_empty());
    }

    #[tokio::test]
    async fn challenge_owner_starts_pending() {
        let app = TestApp::spawn().await;
        app.register("owner@example.com", "challenge_owner").await;

        let user = app.find_user("owner@example.com").await;
        assert_eq!(user.status, common::UserStatus::Pending);
    }

    #[tokio::test]
    async fn email_is_unique_regardless_of_case() {
        let app = TestApp::spawn().await;
        app.register("ada@example.com", "solver").await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({
                    "email": "ADA@example.com",
                    "password": PASSWORD,
                    "first_name": "Ada",
                    "last_name": "Again",
                    "terms_accepted": true,
                }),
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "EMAIL_TAKEN");
    }

    #[tokio::test]
    async fn invalid_input_is_echoed_back_without_the_password() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({
                    "email": "not-an-email",
                    "password": "short",
                    "first_name": "Ada",
                    "last_name": "",
                    "role": "admin",
                }),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        for field in ["email", "password", "last_name", "role", "terms_accepted"] {
            assert!(res.body["fields"][field].is_array(), "missing {field}: {}", res.text);
        }
        assert_eq!(res.body["input"]["email"], "not-an-email");
        assert!(res.body["input"].get("password").is_none());
    }
}

mod login {
    use super::*;

    #[tokio::test]
    async fn unverified_email_cannot_sign_in_until_verified() {
        let app = TestApp::spawn().await;
        app.register("ada@example.com", "solver").await;

        let res = app.login("ada@example.com").await;
        assert_eq!(res.status, 400);
        assert!(res.body["fields"]["email"].is_array());

        let email = app
            .wait_for_email("ada@example.com", "Verify your ChallengeGov account")
            .await;
        let verified = app
            .post_without_token(routes::VERIFY, &json!({"token": token_from(&email.body)}))
            .await;
        assert_eq!(verified.status, 200, "{}", verified.text);

        let res = app.login("ada@example.com").await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["token"].is_string());
        assert_eq!(res.body["permissions"], json!(["submission:submit"]));
    }

    #[tokio::test]
    async fn unknown_verification_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::VERIFY, &json!({"token": "nope"}))
            .await;

        assert_eq!(res.status, 400);
        assert!(res.body["fields"]["token"].is_array());
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let app = TestApp::spawn().await;
        app.create_user("ada@example.com", common::Role::Solver).await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "ada@example.com", "password": "wrong-password"}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn pending_owner_signs_in_without_permissions() {
        let app = TestApp::spawn().await;
        let id = app.register("owner@example.com", "challenge_owner").await;
        let email = app
            .wait_for_email("owner@example.com", "Verify your ChallengeGov account")
            .await;
        app.post_without_token(routes::VERIFY, &json!({"token": token_from(&email.body)}))
            .await;

        let res = app.login("owner@example.com").await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["user"]["id"], id);
        assert_eq!(res.body["permissions"], json!([]));
    }

    #[tokio::test]
    async fn sign_in_and_sign_out_are_logged() {
        let app = TestApp::spawn().await;
        let user = app
            .create_user("ada@example.com", common::Role::Solver)
            .await;

        let res = app
            .post_with_token(routes::LOGOUT, &json!({}), &user.token)
            .await;
        assert_eq!(res.status, 204);

        let accessed = security_log::Entity::find()
            .filter(security_log::Column::Action.eq(SecurityAction::AccessedSite))
            .filter(security_log::Column::OriginatorId.eq(user.id))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(accessed, 1);

        let session = security_log::Entity::find()
            .filter(security_log::Column::Action.eq(SecurityAction::SessionDuration))
            .one(&app.db)
            .await
            .unwrap()
            .expect("session duration should be logged");
        assert!(session.details.unwrap()["duration"].is_i64());
    }

    #[tokio::test]
    async fn suspended_account_is_denied() {
        let app = TestApp::spawn().await;
        let admin = app.create_user("admin@example.com", common::Role::Admin).await;
        let user = app
            .create_user("ada@example.com", common::Role::Solver)
            .await;
        let res = app
            .put_with_token(
                &routes::user_status(user.id),
                &json!({"status": "suspended"}),
                &admin.token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app.login("ada@example.com").await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::ACCOUNT).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }
}

mod password_reset {
    use super::*;

    #[tokio::test]
    async fn unknown_email_gets_the_same_answer() {
        let app = TestApp::spawn().await;
        app.create_user("ada@example.com", common::Role::Solver).await;

        let known = app
            .post_without_token(routes::FORGOT_PASSWORD, &json!({"email": "ada@example.com"}))
            .await;
        let unknown = app
            .post_without_token(routes::FORGOT_PASSWORD, &json!({"email": "bob@example.com"}))
            .await;

        assert_eq!(known.status, 200);
        assert_eq!(unknown.status, 200);
        assert_eq!(known.body, unknown.body);
    }

    #[tokio::test]
    async fn reset_token_works_once() {
        let app = TestApp::spawn().await;
        app.create_user("ada@example.com", common::Role::Solver).await;
        app.post_without_token(routes::FORGOT_PASSWORD, &json!({"email": "ada@example.com"}))
            .await;
        let email = app
            .wait_for_email("ada@example.com", "Reset your ChallengeGov password")
            .await;
        let token = token_from(&email.body);
        let body = json!({"token": token, "password": "a-brand-new-password"});

        let res = app.post_without_token(routes::RESET_PASSWORD, &body).await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "ada@example.com", "password": "a-brand-new-password"}),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let again = app.post_without_token(routes::RESET_PASSWORD, &body).await;
        assert_eq!(again.status, 400);
    }
}
