use common::Role;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;

use server::entity::security_log::{self, SecurityAction};

use crate::common::{TestApp, routes};

#[tokio::test]
async fn dashboard_requires_an_administrator() {
    let app = TestApp::spawn().await;
    let solver = app.create_user("ada@example.com", Role::Solver).await;

    let res = app.get_with_token(routes::ADMIN_DASHBOARD, &solver.token).await;

    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "PERMISSION_DENIED");
    assert!(res.body.get("fields").is_none());
}

#[tokio::test]
async fn dashboard_counts_pending_accounts() {
    let app = TestApp::spawn().await;
    let admin = app.create_user("admin@example.com", Role::Admin).await;
    app.register("owner@example.com", "challenge_owner").await;

    let res = app.get_with_token(routes::ADMIN_DASHBOARD, &admin.token).await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["users_total"], 2);
    assert_eq!(res.body["users_pending"], 1);
    assert_eq!(res.body["certifications_requested"], 0);
}

#[tokio::test]
async fn user_listing_filters_by_role_and_search() {
    let app = TestApp::spawn().await;
    let admin = app.create_user("admin@example.com", Role::Admin).await;
    app.register("grace@example.com", "challenge_owner").await;
    app.register("alan@example.com", "challenge_owner").await;
    app.register("ada@example.com", "solver").await;

    let res = app
        .get_with_token(
            &format!("{}?role=challenge_owner&search=GRACE", routes::ADMIN_USERS),
            &admin.token,
        )
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    let data = res.body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["email"], "grace@example.com");
    assert_eq!(res.body["pagination"]["total"], 1);
}

#[tokio::test]
async fn activating_an_owner_is_logged() {
    let app = TestApp::spawn().await;
    let admin = app.create_user("admin@example.com", Role::Admin).await;
    let owner_id = app.register("owner@example.com", "challenge_owner").await;

    let res = app
        .put_with_token(
            &routes::user_status(owner_id),
            &json!({"status": "active"}),
            &admin.token,
        )
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["status"], "active");
    let entry = security_log::Entity::find()
        .filter(security_log::Column::Action.eq(SecurityAction::StatusChange))
        .one(&app.db)
        .await
        .unwrap()
        .expect("status change should be logged");
    assert_eq!(entry.originator_id, Some(admin.id));
    assert_eq!(entry.details.unwrap(), json!({"old": "pending", "new": "active"}));
}

#[tokio::test]
async fn only_super_admins_grant_admin() {
    let app = TestApp::spawn().await;
    let admin = app.create_user("admin@example.com", Role::Admin).await;
    let root = app.create_user("root@example.com", Role::SuperAdmin).await;
    let user = app.create_user("ada@example.com", Role::Solver).await;
    let body = json!({"role": "admin"});

    let res = app
        .put_with_token(&routes::user_role(user.id), &body, &admin.token)
        .await;
    assert_eq!(res.status, 403);

    let res = app
        .put_with_token(&routes::user_role(user.id), &body, &root.token)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["role"], "admin");

    let entry = security_log::Entity::find()
        .filter(security_log::Column::Action.eq(SecurityAction::RoleChange))
        .one(&app.db)
        .await
        .unwrap()
        .expect("role change should be logged");
    assert_eq!(entry.details.unwrap(), json!({"old": "solver", "new": "admin"}));

    let res = app
        .put_with_token(
            &routes::user_role(user.id),
            &json!({"role": "solver"}),
            &admin.token,
        )
        .await;
    assert_eq!(res.status, 403);
}

#[tokio::test]
async fn certification_requests_are_decided_once() {
    let app = TestApp::spawn().await;
    let admin = app.create_user("admin@example.com", Role::Admin).await;
    let user = app.create_user("ada@example.com", Role::Solver).await;
    app.post_with_token(routes::RECERTIFY, &json!({}), &user.token)
        .await;

    let open = app
        .get_with_token(routes::ADMIN_CERTIFICATIONS, &admin.token)
        .await;
    assert_eq!(open.status, 200);
    assert_eq!(open.body.as_array().unwrap().len(), 1);
    assert_eq!(open.body[0]["user_id"], user.id);

    let res = app
        .post_with_token(
            &routes::certification(user.id),
            &json!({"decision": "certify"}),
            &admin.token,
        )
        .await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["approver_id"], admin.id);
    assert!(res.body["certified_at"].is_string());
    assert!(res.body["expires_at"].is_string());

    let again = app
        .post_with_token(
            &routes::certification(user.id),
            &json!({"decision": "deny"}),
            &admin.token,
        )
        .await;
    assert_eq!(again.status, 409);

    let open = app
        .get_with_token(routes::ADMIN_CERTIFICATIONS, &admin.token)
        .await;
    assert_eq!(open.body, json!([]));
}

#[tokio::test]
async fn security_log_downloads_as_csv() {
    let app = TestApp::spawn().await;
    let admin = app.create_user("admin@example.com", Role::Admin).await;

    let res = app
        .get_with_token(
            &format!("{}?start_date=2000-01-01", routes::SECURITY_LOG),
            &admin.token,
        )
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert!(res.content_type.unwrap().starts_with("text/csv"));
    assert!(
        res.content_disposition
            .unwrap()
            .contains("attachment; filename=\"security-log-from-2000-01-01.csv\"")
    );
    let mut lines = res.text.lines();
    assert!(lines.next().unwrap().starts_with("ID,Action,Details,Originator ID"));
    let row = lines.next().expect("the admin's sign-in is logged");
    assert!(row.contains("accessed_site"), "{row}");
    assert!(row.contains("admin@example.com"), "{row}");
}

#[tokio::test]
async fn log_export_rejects_bad_dates() {
    let app = TestApp::spawn().await;
    let admin = app.create_user("admin@example.com", Role::Admin).await;

    let res = app
        .get_with_token(
            &format!("{}?end_date=last-week", routes::CERTIFICATION_LOG),
            &admin.token,
        )
        .await;

    assert_eq!(res.status, 400);
    assert!(res.body["fields"]["end_date"].is_array());
}
