use common::Role;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;

use server::entity::security_log::{self, SecurityAction};

use crate::common::{PASSWORD, TestApp, routes};

#[tokio::test]
async fn account_returns_the_signed_in_user() {
    let app = TestApp::spawn().await;
    let user = app.create_user("ada@example.com", Role::Solver).await;

    let res = app.get_with_token(routes::ACCOUNT, &user.token).await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["id"], user.id);
    assert_eq!(res.body["email"], "ada@example.com");
    assert!(res.body.get("password_hash").is_none());
}

#[tokio::test]
async fn editing_names_logs_the_changed_fields() {
    let app = TestApp::spawn().await;
    let user = app.create_user("ada@example.com", Role::Solver).await;

    let res = app
        .patch_with_token(
            routes::ACCOUNT,
            &json!({"first_name": "Augusta", "phone_number": "555-0100"}),
            &user.token,
        )
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["first_name"], "Augusta");
    assert_eq!(res.body["phone_number"], "555-0100");

    let entry = security_log::Entity::find()
        .filter(security_log::Column::Action.eq(SecurityAction::AccountUpdate))
        .one(&app.db)
        .await
        .unwrap()
        .expect("account update should be logged");
    assert_eq!(entry.target_id, Some(user.id));
    assert_eq!(
        entry.details.unwrap()["fields"],
        json!(["first_name", "phone_number"])
    );
}

#[tokio::test]
async fn password_change_needs_the_current_password() {
    let app = TestApp::spawn().await;
    let user = app.create_user("ada@example.com", Role::Solver).await;

    let res = app
        .patch_with_token(
            routes::ACCOUNT,
            &json!({"current_password": "not-my-password", "new_password": "another-long-one"}),
            &user.token,
        )
        .await;
    assert_eq!(res.status, 400);
    assert!(res.body["fields"]["current_password"].is_array());

    let res = app
        .patch_with_token(
            routes::ACCOUNT,
            &json!({"current_password": PASSWORD, "new_password": "another-long-one"}),
            &user.token,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    let res = app
        .post_without_token(
            routes::LOGIN,
            &json!({"email": "ada@example.com", "password": "another-long-one"}),
        )
        .await;
    assert_eq!(res.status, 200);
}

#[tokio::test]
async fn only_one_open_recertification_request_at_a_time() {
    let app = TestApp::spawn().await;
    let user = app.create_user("ada@example.com", Role::Solver).await;

    let first = app
        .post_with_token(routes::RECERTIFY, &json!({}), &user.token)
        .await;
    assert_eq!(first.status, 201, "{}", first.text);
    assert_eq!(first.body["user_id"], user.id);
    assert!(first.body["requested_at"].is_string());
    assert!(first.body["certified_at"].is_null());

    let second = app
        .post_with_token(routes::RECERTIFY, &json!({}), &user.token)
        .await;
    assert_eq!(second.status, 409);
    assert_eq!(second.body["code"], "CONFLICT");
}
