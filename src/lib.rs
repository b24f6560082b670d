// src/lib.rs

//! uma-watch: trainer database search monitor

pub mod error;
pub mod models;
pub mod outputs;
pub mod pipeline;
pub mod services;
pub mod storage;
