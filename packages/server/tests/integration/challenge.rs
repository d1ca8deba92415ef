use common::Role;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;

use server::entity::security_log::{self, SecurityAction};
use server::entity::{challenge, document};

use crate::common::{TestApp, complete_challenge, routes};

mod create {
    use super::*;

    #[tokio::test]
    async fn owner_creates_a_draft_and_owns_it() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;

        let res = app
            .post_with_token(routes::CHALLENGES, &json!({"title": "Clean water"}), &owner.token)
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["status"], "draft");
        assert_eq!(res.body["user_id"], owner.id);
        assert_eq!(res.body["owners"][0]["user_id"], owner.id);
        assert!(res.body["uuid"].is_string());
    }

    #[tokio::test]
    async fn draft_needs_a_title() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;

        let res = app
            .post_with_token(routes::CHALLENGES, &json!({"tagline": "No title"}), &owner.token)
            .await;

        assert_eq!(res.status, 400);
        assert!(res.body["fields"]["title"].is_array());
        assert_eq!(res.body["input"]["tagline"], "No title");
    }

    #[tokio::test]
    async fn submit_action_checks_every_section() {
        let app = TestApp::spawn().await;
        let admin = app.create_user("admin@example.com", Role::Admin).await;
        let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;
        let agency_id = app.create_agency(&admin, "NASA").await;

        let res = app
            .post_with_token(
                routes::CHALLENGES,
                &json!({"action": "submit", "title": "Half done"}),
                &owner.token,
            )
            .await;
        assert_eq!(res.status, 400);
        for field in ["agency_id", "tagline", "description"] {
            assert!(res.body["fields"][field].is_array(), "missing {field}: {}", res.text);
        }

        let mut body = complete_challenge(agency_id, "Moon dust");
        body["action"] = json!("submit");
        let res = app.post_with_token(routes::CHALLENGES, &body, &owner.token).await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["status"], "pending");
        assert_eq!(res.body["agency_name"], "NASA");
    }

    #[tokio::test]
    async fn solver_cannot_create() {
        let app = TestApp::spawn().await;
        let solver = app.create_user("ada@example.com", Role::Solver).await;

        let res = app
            .post_with_token(routes::CHALLENGES, &json!({"title": "Mine"}), &solver.token)
            .await;

        assert_eq!(res.status, 403);
    }
}

mod visibility {
    use super::*;

    #[tokio::test]
    async fn drafts_are_hidden_from_other_users() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;
        let solver = app.create_user("ada@example.com", Role::Solver).await;
        let id = app
            .post_with_token(routes::CHALLENGES, &json!({"title": "Secret"}), &owner.token)
            .await
            .id();

        let res = app.get_with_token(&routes::challenge(id), &solver.token).await;
        assert_eq!(res.status, 404);

        let list = app.get_with_token(routes::CHALLENGES, &solver.token).await;
        assert_eq!(list.body["pagination"]["total"], 0);

        let public = app.get_without_token(&routes::public_challenge(id)).await;
        assert_eq!(public.status, 404);

        let mine = app.get_with_token(routes::CHALLENGES, &owner.token).await;
        assert_eq!(mine.body["data"][0]["id"], id);
    }

    #[tokio::test]
    async fn published_challenges_are_public() {
        let app = TestApp::spawn().await;
        let admin = app.create_user("admin@example.com", Role::Admin).await;
        let (id, _) = app.published_challenge(&admin).await;

        let list = app.get_without_token(routes::PUBLIC_CHALLENGES).await;
        assert_eq!(list.status, 200, "{}", list.text);
        assert_eq!(list.body["pagination"]["total"], 1);
        assert_eq!(list.body["data"][0]["id"], id);

        let detail = app.get_without_token(&routes::public_challenge(id)).await;
        assert_eq!(detail.status, 200);
        assert_eq!(detail.body["sub_status"], "open");
        assert!(detail.body["published_on"].is_string());
    }

    #[tokio::test]
    async fn listing_filters_and_sorts() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;
        for title in ["Bravo", "Alpha", "Charlie"] {
            app.post_with_token(routes::CHALLENGES, &json!({"title": title}), &owner.token)
                .await;
        }

        let res = app
            .get_with_token(
                &format!("{}?sort=title:asc&per_page=2", routes::CHALLENGES),
                &owner.token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        let titles: Vec<&str> = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, ["Alpha", "Bravo"]);
        assert_eq!(res.body["pagination"]["total_pages"], 2);

        let res = app
            .get_with_token(&format!("{}?search=char", routes::CHALLENGES), &owner.token)
            .await;
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["title"], "Charlie");
    }
}

mod transitions {
    use super::*;

    #[tokio::test]
    async fn rejection_needs_a_reason_and_emails_owners() {
        let app = TestApp::spawn().await;
        let admin = app.create_user("admin@example.com", Role::Admin).await;
        let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;
        let agency_id = app.create_agency(&admin, "NASA").await;
        let id = app.create_complete_challenge(&owner, agency_id).await["id"]
            .as_i64()
            .unwrap() as i32;

        let res = app.transition(&owner, id, json!({"action": "submit"})).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "pending");

        let res = app.transition(&admin, id, json!({"action": "reject"})).await;
        assert_eq!(res.status, 400);
        assert!(res.body["fields"]["rejection_message"].is_array());

        let res = app
            .transition(
                &admin,
                id,
                json!({"action": "reject", "rejection_message": "Add a prize description"}),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "rejected");
        assert_eq!(res.body["rejection_message"], "Add a prize description");

        let email = app
            .wait_for_email("owner@example.com", "Changes requested for Clean water")
            .await;
        assert!(email.body.contains("Add a prize description"));
    }

    #[tokio::test]
    async fn owners_cannot_review() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;
        let id = app
            .post_with_token(routes::CHALLENGES, &json!({"title": "Mine"}), &owner.token)
            .await
            .id();

        let res = app.transition(&owner, id, json!({"action": "approve"})).await;

        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn incomplete_draft_cannot_be_submitted() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;
        let id = app
            .post_with_token(routes::CHALLENGES, &json!({"title": "Mine"}), &owner.token)
            .await
            .id();

        let res = app.transition(&owner, id, json!({"action": "submit"})).await;

        assert_eq!(res.status, 400);
        assert!(res.body["fields"]["agency_id"].is_array());
    }

    #[tokio::test]
    async fn archived_challenge_cannot_be_published() {
        let app = TestApp::spawn().await;
        let admin = app.create_user("admin@example.com", Role::Admin).await;
        let (id, _) = app.published_challenge(&admin).await;

        let res = app.transition(&admin, id, json!({"action": "archive"})).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["sub_status"], "archived");

        let res = app.transition(&admin, id, json!({"action": "publish"})).await;
        assert_eq!(res.status, 400);
        assert!(res.body["fields"]["status"].is_array());
    }

    #[tokio::test]
    async fn published_challenge_advances_through_set_status() {
        let app = TestApp::spawn().await;
        let admin = app.create_user("admin@example.com", Role::Admin).await;
        let (id, _) = app.published_challenge(&admin).await;

        let res = app
            .transition(&admin, id, json!({"action": "set_status", "status": "vetted"}))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "vetted");

        let res = app
            .transition(&admin, id, json!({"action": "set_status", "status": "draft"}))
            .await;
        assert_eq!(res.status, 400);
    }
}

mod owners {
    use super::*;

    #[tokio::test]
    async fn revoked_owner_loses_edit_access() {
        let app = TestApp::spawn().await;
        let creator = app.create_user("owner@example.com", Role::ChallengeOwner).await;
        let partner = app.create_user("partner@example.com", Role::ChallengeOwner).await;
        let id = app
            .post_with_token(routes::CHALLENGES, &json!({"title": "Shared"}), &creator.token)
            .await
            .id();

        let res = app
            .post_with_token(&routes::owners(id), &json!({"user_id": partner.id}), &creator.token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["owners"].as_array().unwrap().len(), 2);

        let edit = json!({"tagline": "Edited by a partner"});
        let res = app.patch_with_token(&routes::challenge(id), &edit, &partner.token).await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app
            .delete_with_token(&routes::owner(id, partner.id), &creator.token)
            .await;
        assert_eq!(res.status, 204);

        let res = app.patch_with_token(&routes::challenge(id), &edit, &partner.token).await;
        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn solvers_cannot_become_owners() {
        let app = TestApp::spawn().await;
        let creator = app.create_user("owner@example.com", Role::ChallengeOwner).await;
        let solver = app.create_user("ada@example.com", Role::Solver).await;
        let id = app
            .post_with_token(routes::CHALLENGES, &json!({"title": "Shared"}), &creator.token)
            .await
            .id();

        let res = app
            .post_with_token(&routes::owners(id), &json!({"user_id": solver.id}), &creator.token)
            .await;

        assert_eq!(res.status, 400);
        assert!(res.body["fields"]["owner_ids"].is_array());
    }
}

mod documents {
    use super::*;

    #[tokio::test]
    async fn one_unavailable_document_attaches_none() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;
        let id = app
            .post_with_token(routes::CHALLENGES, &json!({"title": "Docs"}), &owner.token)
            .await
            .id();
        let doc_id = app.create_document(&owner, "rules.pdf").await;

        let res = app
            .post_with_token(
                &routes::challenge_documents(id),
                &json!({"document_ids": [doc_id, 9999]}),
                &owner.token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert!(res.body["fields"]["document_ids"].is_array());
        assert_eq!(res.body["input"]["document_ids"], json!([doc_id, 9999]));
        let doc = document::Entity::find_by_id(doc_id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.challenge_id, None);
    }

    #[tokio::test]
    async fn failed_attachment_rolls_back_the_create() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;

        let res = app
            .post_with_token(
                routes::CHALLENGES,
                &json!({"title": "Never saved", "document_ids": [9999]}),
                &owner.token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert!(res.body["fields"]["document_ids"].is_array());
        assert_eq!(res.body["input"]["document_ids"], json!([9999]));
        let count = challenge::Entity::find().count(&app.db).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn attached_documents_show_on_the_challenge() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;
        let id = app
            .post_with_token(routes::CHALLENGES, &json!({"title": "Docs"}), &owner.token)
            .await
            .id();
        let doc_id = app.create_document(&owner, "rules.pdf").await;

        let res = app
            .post_with_token(
                &routes::challenge_documents(id),
                &json!({"document_ids": [doc_id]}),
                &owner.token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let detail = app.get_with_token(&routes::challenge(id), &owner.token).await;
        assert_eq!(detail.body["documents"][0]["id"], doc_id);
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn owner_deletes_only_drafts() {
        let app = TestApp::spawn().await;
        let admin = app.create_user("admin@example.com", Role::Admin).await;
        let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;
        let agency_id = app.create_agency(&admin, "NASA").await;
        let draft = app
            .post_with_token(routes::CHALLENGES, &json!({"title": "Scrap"}), &owner.token)
            .await
            .id();
        let mut body = complete_challenge(agency_id, "Keep");
        body["action"] = json!("submit");
        let pending = app
            .post_with_token(routes::CHALLENGES, &body, &owner.token)
            .await
            .id();

        let res = app.delete_with_token(&routes::challenge(draft), &owner.token).await;
        assert_eq!(res.status, 204);
        let res = app.get_with_token(&routes::challenge(draft), &owner.token).await;
        assert_eq!(res.status, 404);

        let res = app.delete_with_token(&routes::challenge(pending), &owner.token).await;
        assert_eq!(res.status, 403);

        let res = app.delete_with_token(&routes::challenge(pending), &admin.token).await;
        assert_eq!(res.status, 204);
    }

    #[tokio::test]
    async fn deletion_is_logged_with_the_old_status() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;
        let draft = app
            .post_with_token(routes::CHALLENGES, &json!({"title": "Scrap"}), &owner.token)
            .await
            .id();

        let res = app.delete_with_token(&routes::challenge(draft), &owner.token).await;
        assert_eq!(res.status, 204);

        let entry = security_log::Entity::find()
            .filter(security_log::Column::Action.eq(SecurityAction::ChallengeDelete))
            .one(&app.db)
            .await
            .unwrap()
            .expect("deletion should be logged");
        assert_eq!(entry.originator_id, Some(owner.id));
        assert_eq!(entry.target_id, Some(draft));
        assert_eq!(entry.target_type.as_deref(), Some("challenge"));
        assert_eq!(entry.details.unwrap()["status"], "draft");
    }

    #[tokio::test]
    async fn refused_deletion_leaves_no_log() {
        let app = TestApp::spawn().await;
        let admin = app.create_user("admin@example.com", Role::Admin).await;
        let owner = app.create_user("owner@example.com", Role::ChallengeOwner).await;
        let agency_id = app.create_agency(&admin, "NASA").await;
        let mut body = complete_challenge(agency_id, "Keep");
        body["action"] = json!("submit");
        let pending = app
            .post_with_token(routes::CHALLENGES, &body, &owner.token)
            .await
            .id();

        let res = app.delete_with_token(&routes::challenge(pending), &owner.token).await;
        assert_eq!(res.status, 403);

        let logged = security_log::Entity::find()
            .filter(security_log::Column::Action.eq(SecurityAction::ChallengeDelete))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(logged, 0);
    }
}
