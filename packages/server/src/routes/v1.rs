use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers::{
    account, admin, agency, auth, challenge, document, export, submission, wizard,
};
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
        .nest("/challenges", challenge_routes())
        .nest("/submissions", submission_routes())
        .nest("/documents", document_routes())
        .nest("/agencies", agency_routes())
        .nest("/admin", admin_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(auth::register))
        .routes(routes!(auth::verify_email))
        .routes(routes!(auth::forgot_password))
        .routes(routes!(auth::reset_password))
        .routes(routes!(auth::login))
        .routes(routes!(auth::logout))
}

fn account_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(account::get_account, account::update_account))
        .routes(routes!(account::request_recertification))
}

fn challenge_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            challenge::list_challenges,
            challenge::create_challenge
        ))
        .routes(routes!(challenge::list_public_challenges))
        .routes(routes!(challenge::get_public_challenge))
        .routes(routes!(
            challenge::get_challenge,
            challenge::update_challenge,
            challenge::delete_challenge
        ))
        .routes(routes!(challenge::transition_challenge))
        .routes(routes!(challenge::add_owner))
        .routes(routes!(challenge::revoke_owner))
        .routes(routes!(challenge::attach_documents))
        .routes(routes!(challenge::add_timeline_event))
        .routes(routes!(challenge::list_phases))
        .merge(wizard_routes())
        .merge(export_routes())
}

fn wizard_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(wizard::start_wizard))
        .routes(routes!(wizard::resume_wizard))
        .routes(routes!(wizard::save_section))
}

fn export_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(export::list_exports, export::create_export))
        .routes(routes!(export::download_export))
        .routes(routes!(export::regenerate_export))
}

fn submission_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            submission::list_submissions,
            submission::create_submission
        ))
        .routes(routes!(
            submission::get_submission,
            submission::update_submission,
            submission::delete_submission
        ))
        .routes(routes!(submission::submit_submission))
        .routes(routes!(submission::verify_submission))
        .routes(routes!(submission::judge_submission))
        .routes(routes!(submission::attach_documents))
}

fn document_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(document::create_document))
        .routes(routes!(document::delete_document))
}

fn agency_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(agency::list_agencies, agency::create_agency))
}

fn admin_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(admin::dashboard))
        .routes(routes!(admin::list_users))
        .routes(routes!(admin::update_role))
        .routes(routes!(admin::update_status))
        .routes(routes!(admin::list_certification_requests))
        .routes(routes!(admin::decide_certification))
        .routes(routes!(admin::export_security_log))
        .routes(routes!(admin::export_certification_log))
}
