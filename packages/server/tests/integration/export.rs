use common::Role;
use serde_json::json;

use crate::common::{TestApp, TestUser, routes};

struct Setup {
    admin: TestUser,
    owner: TestUser,
    solver: TestUser,
    challenge_id: i32,
    phase_id: i32,
}

/// A published challenge owned by `owner`, with one submitted entry and one draft.
async fn setup(app: &TestApp) -> (Setup, i32) {
    let admin = app.create_user("admin@example.com", Role::Admin).await;
    let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;
    let solver = app.create_user("ada@example.com", Role::Solver).await;
    let agency_id = app.create_agency(&admin, "NASA").await;
    let challenge = app.create_complete_challenge(&owner, agency_id).await;
    let challenge_id = challenge["id"].as_i64().unwrap() as i32;
    let phase_id = challenge["phases"][0]["id"].as_i64().unwrap() as i32;
    let res = app
        .transition(&admin, challenge_id, json!({"action": "publish"}))
        .await;
    assert_eq!(res.status, 200, "publish failed: {}", res.text);

    let submitted = app
        .create_submission(&solver, challenge_id, phase_id, "Sand filter")
        .await;
    let res = app
        .post_with_token(&routes::submit(submitted), &json!({}), &solver.token)
        .await;
    assert_eq!(res.status, 200, "submit failed: {}", res.text);
    app.create_submission(&solver, challenge_id, phase_id, "Unsent draft")
        .await;

    (
        Setup {
            admin,
            owner,
            solver,
            challenge_id,
            phase_id,
        },
        submitted,
    )
}

#[tokio::test]
async fn owner_downloads_submitted_entries_as_csv() {
    let app = TestApp::spawn().await;
    let (s, _) = setup(&app).await;

    let res = app
        .post_with_token(&routes::exports(s.challenge_id), &json!({}), &s.owner.token)
        .await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["judging_status"], "all");
    assert_eq!(res.body["status"], "completed");
    assert_eq!(res.body["format"], "csv");
    let export_id = res.id();

    let csv = app
        .get_with_token(&routes::export(s.challenge_id, export_id), &s.owner.token)
        .await;
    assert_eq!(csv.status, 200, "{}", csv.text);
    assert!(csv.content_type.unwrap().starts_with("text/csv"));
    assert_eq!(
        csv.content_disposition.unwrap(),
        format!(
            "attachment; filename=\"challenge-{}-submissions-{export_id}.csv\"",
            s.challenge_id
        )
    );
    let mut lines = csv.text.lines();
    assert!(
        lines
            .next()
            .unwrap()
            .starts_with("Submission ID,Submitter email,Submitter name,Phase,Title")
    );
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 1, "{}", csv.text);
    assert!(rows[0].contains("ada@example.com"));
    assert!(rows[0].contains("Sand filter"));
    assert!(!csv.text.contains("Unsent draft"));
}

#[tokio::test]
async fn judging_marks_exports_outdated_until_regenerated() {
    let app = TestApp::spawn().await;
    let (s, submitted) = setup(&app).await;

    let res = app
        .post_with_token(
            &routes::exports(s.challenge_id),
            &json!({"judging_status": "winner", "phase_ids": [s.phase_id]}),
            &s.owner.token,
        )
        .await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["judging_status"], "winner");
    assert_eq!(res.body["phase_ids"], json!([s.phase_id]));
    let export_id = res.id();

    let res = app
        .put_with_token(
            &routes::judging(submitted),
            &json!({"judging_status": "winner"}),
            &s.admin.token,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    let list = app
        .get_with_token(&routes::exports(s.challenge_id), &s.owner.token)
        .await;
    assert_eq!(list.body[0]["id"], export_id);
    assert_eq!(list.body[0]["status"], "outdated");

    let csv = app
        .get_with_token(&routes::export(s.challenge_id, export_id), &s.owner.token)
        .await;
    assert_eq!(csv.status, 200);
    assert!(csv.text.contains("Sand filter"), "{}", csv.text);

    let list = app
        .get_with_token(&routes::exports(s.challenge_id), &s.owner.token)
        .await;
    assert_eq!(list.body[0]["status"], "completed");
}

#[tokio::test]
async fn regenerate_refreshes_an_export() {
    let app = TestApp::spawn().await;
    let (s, _) = setup(&app).await;
    let export_id = app
        .post_with_token(&routes::exports(s.challenge_id), &json!({}), &s.admin.token)
        .await
        .id();
    app.create_submission(&s.solver, s.challenge_id, s.phase_id, "Another draft")
        .await;

    let res = app
        .post_with_token(
            &format!("{}/regenerate", routes::export(s.challenge_id, export_id)),
            &json!({}),
            &s.admin.token,
        )
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["status"], "completed");
}

#[tokio::test]
async fn only_owners_and_admins_export() {
    let app = TestApp::spawn().await;
    let (s, _) = setup(&app).await;
    let stranger = app
        .create_user("stranger@example.com", Role::ChallengeOwner)
        .await;

    let res = app
        .post_with_token(&routes::exports(s.challenge_id), &json!({}), &s.solver.token)
        .await;
    assert_eq!(res.status, 403);

    let res = app
        .post_with_token(&routes::exports(s.challenge_id), &json!({}), &stranger.token)
        .await;
    assert_eq!(res.status, 403);

    let res = app
        .post_with_token(&routes::exports(s.challenge_id), &json!({}), &s.admin.token)
        .await;
    assert_eq!(res.status, 201);
}

#[tokio::test]
async fn unknown_judging_status_is_a_field_error() {
    let app = TestApp::spawn().await;
    let (s, _) = setup(&app).await;

    let res = app
        .post_with_token(
            &routes::exports(s.challenge_id),
            &json!({"judging_status": "runner_up"}),
            &s.owner.token,
        )
        .await;

    assert_eq!(res.status, 400);
    assert!(res.body["fields"]["judging_status"].is_array());
    assert_eq!(res.body["input"]["judging_status"], "runner_up");
}
