// fluxdash: a terminal dashboard that polls Flux time-series queries
// and renders each grouped result as a live sparkline.

pub mod config;
pub mod dataset;
pub mod flux;
pub mod poll;
pub mod state;
pub mod template;
pub mod ui;
