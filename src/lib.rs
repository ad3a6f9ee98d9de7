// MANIMATOR Core Library
// Copyright (c) 2026 Xing_The_Creator | MANIMATOR

pub mod agent;
pub mod config;
pub mod error;
pub mod server;
pub mod state;
