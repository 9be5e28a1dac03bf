pub mod activity;
pub mod application;
pub mod banner;
pub mod committee;
pub mod dashboard;
pub mod event;
pub mod gallery;
pub mod member;
pub mod notice;
pub mod search;
pub mod session;
pub mod user;
