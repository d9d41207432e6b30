//! Shared test utilities

pub mod installation;
