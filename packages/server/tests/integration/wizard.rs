use common::Role;
use serde_json::json;

use crate::common::{TestApp, TestUser, routes};

async fn start(app: &TestApp, owner: &TestUser, agency_id: i32) -> i32 {
    let res = app
        .post_with_token(
            routes::WIZARD,
            &json!({"title": "Clean water", "agency_id": agency_id}),
            &owner.token,
        )
        .await;
    assert_eq!(res.status, 201, "start failed: {}", res.text);
    res.body["challenge"]["id"].as_i64().unwrap() as i32
}

#[tokio::test]
async fn starting_creates_a_draft_on_details() {
    let app = TestApp::spawn().await;
    let admin = app.create_user("admin@example.com", Role::Admin).await;
    let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;
    let agency_id = app.create_agency(&admin, "NASA").await;

    let res = app
        .post_with_token(
            routes::WIZARD,
            &json!({"title": "Clean water", "agency_id": agency_id, "tagline": "Ignored here"}),
            &owner.token,
        )
        .await;

    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["section"], "details");
    assert_eq!(res.body["challenge"]["status"], "draft");
    assert_eq!(res.body["challenge"]["last_section"], "details");
    assert!(res.body["challenge"]["tagline"].is_null());
}

#[tokio::test]
async fn starting_validates_the_general_section() {
    let app = TestApp::spawn().await;
    let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;

    let res = app
        .post_with_token(routes::WIZARD, &json!({"title": "No agency"}), &owner.token)
        .await;

    assert_eq!(res.status, 400);
    assert!(res.body["fields"]["agency_id"].is_array());
    assert_eq!(res.body["input"]["title"], "No agency");
}

#[tokio::test]
async fn next_validates_and_keeps_the_owner_in_place() {
    let app = TestApp::spawn().await;
    let admin = app.create_user("admin@example.com", Role::Admin).await;
    let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;
    let id = start(&app, &owner, app.create_agency(&admin, "NASA").await).await;

    let res = app
        .put_with_token(
            &routes::wizard_section(id, "details"),
            &json!({"action": "next", "tagline": "Test the water"}),
            &owner.token,
        )
        .await;
    assert_eq!(res.status, 400);
    assert!(res.body["fields"]["brief_description"].is_array());
    assert_eq!(res.body["input"]["tagline"], "Test the water");

    let resumed = app.get_with_token(&routes::wizard(id), &owner.token).await;
    assert_eq!(resumed.body["section"], "details");
    assert!(resumed.body["challenge"]["tagline"].is_null());

    let res = app
        .put_with_token(
            &routes::wizard_section(id, "details"),
            &json!({
                "action": "next",
                "tagline": "Test the water",
                "brief_description": "Find better filters",
                "description": "A longer description.",
            }),
            &owner.token,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["section"], "timeline");
}

#[tokio::test]
async fn back_saves_partial_input() {
    let app = TestApp::spawn().await;
    let admin = app.create_user("admin@example.com", Role::Admin).await;
    let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;
    let id = start(&app, &owner, app.create_agency(&admin, "NASA").await).await;

    let res = app
        .put_with_token(
            &routes::wizard_section(id, "details"),
            &json!({"action": "back", "tagline": "Half written"}),
            &owner.token,
        )
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["section"], "general");
    assert_eq!(res.body["challenge"]["tagline"], "Half written");
    assert_eq!(res.body["challenge"]["last_section"], "general");
}

#[tokio::test]
async fn submit_is_only_offered_on_review() {
    let app = TestApp::spawn().await;
    let admin = app.create_user("admin@example.com", Role::Admin).await;
    let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;
    let id = start(&app, &owner, app.create_agency(&admin, "NASA").await).await;

    let res = app
        .put_with_token(
            &routes::wizard_section(id, "details"),
            &json!({"action": "submit"}),
            &owner.token,
        )
        .await;

    assert_eq!(res.status, 400);
    assert!(res.body["fields"]["action"].is_array());
}

#[tokio::test]
async fn unknown_section_is_rejected() {
    let app = TestApp::spawn().await;
    let admin = app.create_user("admin@example.com", Role::Admin).await;
    let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;
    let id = start(&app, &owner, app.create_agency(&admin, "NASA").await).await;

    let res = app
        .put_with_token(
            &routes::wizard_section(id, "budget"),
            &json!({"action": "save_draft"}),
            &owner.token,
        )
        .await;

    assert_eq!(res.status, 400);
    assert!(res.body["fields"]["section"].is_array());
}

#[tokio::test]
async fn review_submit_hands_in_a_complete_challenge() {
    let app = TestApp::spawn().await;
    let admin = app.create_user("admin@example.com", Role::Admin).await;
    let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;
    let agency_id = app.create_agency(&admin, "NASA").await;
    let id = app.create_complete_challenge(&owner, agency_id).await["id"]
        .as_i64()
        .unwrap() as i32;

    let res = app
        .put_with_token(
            &routes::wizard_section(id, "review"),
            &json!({"action": "submit"}),
            &owner.token,
        )
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["section"], "review");
    assert_eq!(res.body["challenge"]["status"], "pending");
}

#[tokio::test]
async fn incomplete_challenge_stays_a_draft_on_submit() {
    let app = TestApp::spawn().await;
    let admin = app.create_user("admin@example.com", Role::Admin).await;
    let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;
    let id = start(&app, &owner, app.create_agency(&admin, "NASA").await).await;

    let res = app
        .put_with_token(
            &routes::wizard_section(id, "review"),
            &json!({"action": "submit"}),
            &owner.token,
        )
        .await;
    assert_eq!(res.status, 400);
    assert!(res.body["fields"]["tagline"].is_array());

    let resumed = app.get_with_token(&routes::wizard(id), &owner.token).await;
    assert_eq!(resumed.body["challenge"]["status"], "draft");
    assert_eq!(resumed.body["section"], "details");
}

#[tokio::test]
async fn owners_leave_the_wizard_once_published() {
    let app = TestApp::spawn().await;
    let admin = app.create_user("admin@example.com", Role::Admin).await;
    let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;
    let agency_id = app.create_agency(&admin, "NASA").await;
    let id = app.create_complete_challenge(&owner, agency_id).await["id"]
        .as_i64()
        .unwrap() as i32;
    let res = app.transition(&admin, id, json!({"action": "publish"})).await;
    assert_eq!(res.status, 200, "{}", res.text);

    let res = app.get_with_token(&routes::wizard(id), &owner.token).await;
    assert_eq!(res.status, 403);

    let res = app.get_with_token(&routes::wizard(id), &admin.token).await;
    assert_eq!(res.status, 200);
}
