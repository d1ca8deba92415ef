mod account;
mod admin;
mod auth;
mod challenge;
mod common;
mod export;
mod submission;
mod wizard;
