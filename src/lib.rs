//! Quick-look viewer for astronomical FITS images.
//!
//! The `fits` and `data` modules hold everything that does not need a
//! window; `app`, `state`, `preview` and `ui` build the egui front end on
//! top of them.

pub mod app;
pub mod config;
pub mod data;
pub mod fits;
pub mod preview;
pub mod state;
pub mod ui;
