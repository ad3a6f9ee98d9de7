// MANIMATOR Agent Modules
// Copyright (c) 2026 Xing_The_Creator | MANIMATOR

pub mod animation;
pub mod code_extract;
pub mod few_shot;
pub mod llm_bridge;
pub mod pdf_tools;
pub mod prompts;
pub mod render_supervisor;
pub mod scene_description;
pub mod workspace;

pub mod pipeline; // Orchestration
