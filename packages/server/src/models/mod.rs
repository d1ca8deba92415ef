pub mod account;
pub mod admin;
pub mod agency;
pub mod auth;
pub mod challenge;
pub mod document;
pub mod export;
pub mod shared;
pub mod submission;
pub mod wizard;
