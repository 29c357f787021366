pub mod catalog;
pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod grant;
pub mod ident;
pub mod inspect;
pub mod report;
pub mod roles;
