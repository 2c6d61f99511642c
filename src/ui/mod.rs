// Terminal UI using Ratatui

pub mod chart;
pub mod dashboard;
pub mod events;

pub use chart::SparklineGroup;
pub use dashboard::Dashboard;
pub use events::{UiEvent, run_ui, spawn_event_thread};
