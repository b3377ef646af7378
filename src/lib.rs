//! Scene-aware background automation: recognize what a target window is
//! showing and replay scripted input into it without taking focus.

pub mod automation;
pub mod config;
pub mod core;
pub mod execution;
pub mod models;
