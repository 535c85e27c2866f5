//! queuecast: a Discord voice bot that plays audio from video links through a
//! per-guild FIFO queue.

pub mod audio;
pub mod bot;
pub mod config;
pub mod error;
pub mod sources;
pub mod ui;
