pub mod analyzer;
pub mod auth;
pub mod banner;
pub mod config;
pub mod consts;
pub mod notify;
pub mod photo;
pub mod session;
pub mod web;
