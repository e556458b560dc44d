// src/lib.rs

pub mod config;
pub mod controller;
pub mod error;
pub mod fetcher;
pub mod launcher;
pub mod poller;
pub mod session;
pub mod shim;
pub mod statements;
pub mod utils;
