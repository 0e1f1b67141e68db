//! PixelEd — a small grid-snapped pixel-art editor.
//!
//! The editable canvas engine (pixel buffer, flood fill, snapshot history,
//! edit-session state machine) lives in [`canvas`] and
//! [`components::history`]; everything else is egui glue around it.

pub mod app;
pub mod canvas;
pub mod components;
pub mod io;
pub mod logger;
