pub mod api;
pub mod canvas;
pub mod config;
pub mod dialog;
pub mod editor;
pub mod interaction;
pub mod model;
pub mod state;
pub mod sync;
