#![forbid(unsafe_code)]

pub mod callback_store;
pub mod config;
pub mod errors;
pub mod forwarder;
pub mod notice;
pub mod relay_utils;
pub mod templates;
