use common::Role;
use serde_json::json;

use crate::common::{TestApp, TestUser, routes};

/// Published challenge created by `owner`; returns `(challenge_id, phase_id)`.
async fn owned_published_challenge(app: &TestApp, admin: &TestUser, owner: &TestUser) -> (i32, i32) {
    let agency_id = app.create_agency(admin, "NASA").await;
    let challenge = app.create_complete_challenge(owner, agency_id).await;
    let id = challenge["id"].as_i64().unwrap() as i32;
    let res = app.transition(admin, id, json!({"action": "publish"})).await;
    assert_eq!(res.status, 200, "publish failed: {}", res.text);
    (id, challenge["phases"][0]["id"].as_i64().unwrap() as i32)
}

async fn submit(app: &TestApp, user: &TestUser, id: i32) {
    let res = app.post_with_token(&routes::submit(id), &json!({}), &user.token).await;
    assert_eq!(res.status, 200, "submit failed: {}", res.text);
}

mod create {
    use super::*;

    #[tokio::test]
    async fn unpublished_challenge_takes_no_submissions() {
        let app = TestApp::spawn().await;
        let admin = app.create_user("admin@example.com", Role::Admin).await;
        let solver = app.create_user("ada@example.com", Role::Solver).await;
        let agency_id = app.create_agency(&admin, "NASA").await;
        let challenge = app.create_complete_challenge(&admin, agency_id).await;

        let res = app
            .post_with_token(
                routes::SUBMISSIONS,
                &json!({
                    "challenge_id": challenge["id"],
                    "phase_id": challenge["phases"][0]["id"],
                    "title": "Too early",
                }),
                &solver.token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert!(res.body["fields"]["challenge_id"].is_array());
        assert_eq!(res.body["input"]["title"], "Too early");
    }

    #[tokio::test]
    async fn review_action_requires_the_essentials() {
        let app = TestApp::spawn().await;
        let admin = app.create_user("admin@example.com", Role::Admin).await;
        let solver = app.create_user("ada@example.com", Role::Solver).await;
        let (cid, pid) = app.published_challenge(&admin).await;

        let res = app
            .post_with_token(
                routes::SUBMISSIONS,
                &json!({"challenge_id": cid, "phase_id": pid, "action": "review"}),
                &solver.token,
            )
            .await;

        assert_eq!(res.status, 400);
        for field in ["title", "brief_description", "terms_accepted"] {
            assert!(res.body["fields"][field].is_array(), "missing {field}: {}", res.text);
        }
    }

    #[tokio::test]
    async fn draft_saves_with_a_bare_title() {
        let app = TestApp::spawn().await;
        let admin = app.create_user("admin@example.com", Role::Admin).await;
        let solver = app.create_user("ada@example.com", Role::Solver).await;
        let (cid, pid) = app.published_challenge(&admin).await;

        let res = app
            .post_with_token(
                routes::SUBMISSIONS,
                &json!({"challenge_id": cid, "phase_id": pid, "title": "Idea"}),
                &solver.token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["status"], "draft");
        assert_eq!(res.body["judging_status"], "not_selected");
        assert_eq!(res.body["submitter_id"], solver.id);
        assert!(res.body["manager_id"].is_null());
    }

    #[tokio::test]
    async fn solvers_cannot_file_for_someone_else() {
        let app = TestApp::spawn().await;
        let admin = app.create_user("admin@example.com", Role::Admin).await;
        let solver = app.create_user("ada@example.com", Role::Solver).await;
        app.create_user("bob@example.com", Role::Solver).await;
        let (cid, pid) = app.published_challenge(&admin).await;

        let res = app
            .post_with_token(
                routes::SUBMISSIONS,
                &json!({
                    "challenge_id": cid,
                    "phase_id": pid,
                    "submitter_email": "bob@example.com",
                    "title": "For Bob",
                }),
                &solver.token,
            )
            .await;

        assert_eq!(res.status, 403);
    }
}

mod submit {
    use super::*;

    #[tokio::test]
    async fn submitting_emails_the_solver_and_the_owners() {
        let app = TestApp::spawn().await;
        let admin = app.create_user("admin@example.com", Role::Admin).await;
        let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;
        let solver = app.create_user("ada@example.com", Role::Solver).await;
        let (cid, pid) = owned_published_challenge(&app, &admin, &owner).await;
        let id = app.create_submission(&solver, cid, pid, "Sand filter").await;

        let res = app.post_with_token(&routes::submit(id), &json!({}), &solver.token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "submitted");
        assert!(res.body["submitted_at"].is_string());
        let confirmation = app
            .wait_for_email("ada@example.com", "Submission received for Clean water")
            .await;
        assert!(confirmation.body.contains("Sand filter"));
        app.wait_for_email("owner@example.com", "New submission to Clean water")
            .await;
    }

    #[tokio::test]
    async fn submission_is_submitted_once() {
        let app = TestApp::spawn().await;
        let admin = app.create_user("admin@example.com", Role::Admin).await;
        let solver = app.create_user("ada@example.com", Role::Solver).await;
        let (cid, pid) = app.published_challenge(&admin).await;
        let id = app.create_submission(&solver, cid, pid, "Sand filter").await;
        submit(&app, &solver, id).await;

        let res = app.post_with_token(&routes::submit(id), &json!({}), &solver.token).await;

        assert_eq!(res.status, 400);
        assert!(res.body["fields"]["status"].is_array());
    }

    #[tokio::test]
    async fn other_solvers_cannot_see_or_submit() {
        let app = TestApp::spawn().await;
        let admin = app.create_user("admin@example.com", Role::Admin).await;
        let solver = app.create_user("ada@example.com", Role::Solver).await;
        let other = app.create_user("bob@example.com", Role::Solver).await;
        let (cid, pid) = app.published_challenge(&admin).await;
        let id = app.create_submission(&solver, cid, pid, "Sand filter").await;

        let res = app.get_with_token(&routes::submission(id), &other.token).await;
        assert_eq!(res.status, 404);

        let res = app.post_with_token(&routes::submit(id), &json!({}), &other.token).await;
        assert_eq!(res.status, 403);
    }
}

mod managed {
    use super::*;

    #[tokio::test]
    async fn solver_verifies_before_the_manager_submits() {
        let app = TestApp::spawn().await;
        let admin = app.create_user("admin@example.com", Role::Admin).await;
        let solver = app.create_user("ada@example.com", Role::Solver).await;
        let (cid, pid) = app.published_challenge(&admin).await;

        let res = app
            .post_with_token(
                routes::SUBMISSIONS,
                &json!({
                    "challenge_id": cid,
                    "phase_id": pid,
                    "submitter_email": "ADA@example.com",
                    "title": "Filed by staff",
                    "brief_description": "Taken over the phone",
                    "terms_accepted": true,
                }),
                &admin.token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["submitter_id"], solver.id);
        assert_eq!(res.body["manager_id"], admin.id);
        assert_eq!(res.body["review_verified"], false);
        let id = res.id();

        let res = app.post_with_token(&routes::submit(id), &json!({}), &admin.token).await;
        assert_eq!(res.status, 400);
        assert!(res.body["fields"]["review_verified"].is_array());

        let res = app
            .post_with_token(&routes::verify_submission(id), &json!({}), &solver.token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["review_verified"], true);
        app.wait_for_email(
            "admin@example.com",
            &format!("Submission #{id} was verified by the solver"),
        )
        .await;

        submit(&app, &admin, id).await;
        app.wait_for_email("ada@example.com", "Submission received").await;
    }

    #[tokio::test]
    async fn unknown_solver_email_is_a_field_error() {
        let app = TestApp::spawn().await;
        let admin = app.create_user("admin@example.com", Role::Admin).await;
        let (cid, pid) = app.published_challenge(&admin).await;

        let res = app
            .post_with_token(
                routes::SUBMISSIONS,
                &json!({
                    "challenge_id": cid,
                    "phase_id": pid,
                    "submitter_email": "nobody@example.com",
                }),
                &admin.token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert!(res.body["fields"]["submitter_email"].is_array());
    }
}

mod judging {
    use super::*;

    #[tokio::test]
    async fn owners_judge_submitted_entries_only() {
        let app = TestApp::spawn().await;
        let admin = app.create_user("admin@example.com", Role::Admin).await;
        let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;
        let solver = app.create_user("ada@example.com", Role::Solver).await;
        let (cid, pid) = owned_published_challenge(&app, &admin, &owner).await;
        let id = app.create_submission(&solver, cid, pid, "Sand filter").await;
        let body = json!({"judging_status": "qualified"});

        let res = app.put_with_token(&routes::judging(id), &body, &owner.token).await;
        assert_eq!(res.status, 400);
        assert!(res.body["fields"]["judging_status"].is_array());

        submit(&app, &solver, id).await;
        let res = app.put_with_token(&routes::judging(id), &body, &solver.token).await;
        assert_eq!(res.status, 403);

        let res = app.put_with_token(&routes::judging(id), &body, &owner.token).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["judging_status"], "qualified");
    }

    #[tokio::test]
    async fn unknown_judging_status_is_keyed_on_its_field() {
        let app = TestApp::spawn().await;
        let admin = app.create_user("admin@example.com", Role::Admin).await;
        let solver = app.create_user("ada@example.com", Role::Solver).await;
        let (cid, pid) = app.published_challenge(&admin).await;
        let id = app.create_submission(&solver, cid, pid, "Sand filter").await;

        let res = app
            .put_with_token(
                &routes::judging(id),
                &json!({"judging_status": "runner_up"}),
                &admin.token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert!(res.body["fields"]["judging_status"].is_array(), "{}", res.text);
    }

    #[tokio::test]
    async fn selected_filter_includes_winners() {
        let app = TestApp::spawn().await;
        let admin = app.create_user("admin@example.com", Role::Admin).await;
        let solver = app.create_user("ada@example.com", Role::Solver).await;
        let (cid, pid) = app.published_challenge(&admin).await;
        for (title, status) in [
            ("Gold", "winner"),
            ("Silver", "selected"),
            ("Bronze", "qualified"),
        ] {
            let id = app.create_submission(&solver, cid, pid, title).await;
            submit(&app, &solver, id).await;
            let res = app
                .put_with_token(
                    &routes::judging(id),
                    &json!({"judging_status": status}),
                    &admin.token,
                )
                .await;
            assert_eq!(res.status, 200, "{}", res.text);
        }

        let res = app
            .get_with_token(
                &format!(
                    "{}?challenge_id={cid}&judging_status=selected&sort=title:asc",
                    routes::SUBMISSIONS
                ),
                &admin.token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let titles: Vec<&str> = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, ["Gold", "Silver"]);

        let mine = app.get_with_token(routes::SUBMISSIONS, &solver.token).await;
        assert_eq!(mine.body["pagination"]["total"], 3);
    }
}
