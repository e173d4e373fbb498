//! Template sets: compilation, registry and helpers
//!
//! A template set is a directory of minijinja templates compiled into one
//! environment and registered under a name in [`TemplateSets`]. Sets are
//! recompiled on every render in development mode and cached in production.
//!
//! # Layouts
//!
//! A layout is an ordinary template that calls `yield()` where the requested
//! page belongs, and may call `current()` to learn the page's name:
//!
//! ```text
//! templates/layout.html   <html><body>{{ yield() }}</body></html>
//! templates/index.html    <h1>{{ title }}</h1>
//! ```
//!
//! Rendering `index` with the layout `layout` produces
//! `<html><body><h1>...</h1></body></html>`.

pub mod compiler;
pub mod helpers;
pub mod registry;

pub use compiler::compile;
pub use helpers::FuncMap;
pub use registry::TemplateSets;
