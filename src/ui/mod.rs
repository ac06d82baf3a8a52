//! User interface components.
//!
//! - [`app`] - Application root and the single media screen
//! - [`components`] - Control rows and the notice stack

mod app;
mod components;

pub use app::App;
