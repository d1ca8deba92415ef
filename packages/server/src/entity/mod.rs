pub mod agency;
pub mod certification_log;
pub mod challenge;
pub mod challenge_owner;
pub mod document;
pub mod federal_partner;
pub mod non_federal_partner;
pub mod phase;
pub mod role;
pub mod role_permission;
pub mod security_log;
pub mod submission;
pub mod submission_export;
pub mod timeline_event;
pub mod user;
