pub mod backoffice;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod favorites;
pub mod filter;
pub mod gateway;
pub mod models;
pub mod present;
pub mod profile;
pub mod ranking;
pub mod routes;
pub mod session;
pub mod view;
