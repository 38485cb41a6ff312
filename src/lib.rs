pub mod backend;
pub mod cli;
pub mod config;
pub mod diagram;
pub mod models;
pub mod session;
pub mod storage;
