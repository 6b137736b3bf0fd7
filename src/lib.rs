pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod export_pipeline;
pub mod ffmpeg;
pub mod player;
pub mod project;
pub mod utils;

pub use app::Editor;
pub use config::EditorConfig;
pub use error::{EditorError, Result};
