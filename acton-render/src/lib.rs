//! acton-render: response rendering for axum applications
//!
//! Renders JSON, XML, raw bytes and minijinja HTML templates into HTTP
//! responses. Templates are organized in named template sets, one directory
//! each, compiled up front so that syntax errors surface at startup. HTML
//! renders can be wrapped in a layout that places the page with `yield()`.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use acton_render::prelude::*;
//! use axum::{routing::get, Router};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     acton_render::observability::init()?;
//!
//!     // Compile templates/ once; errors here are fatal for startup
//!     let renderer = Renderer::new(RenderOptions::default().with_layout("layout"))?;
//!
//!     let app = Router::new()
//!         .route("/", get(index))
//!         .route("/api", get(api))
//!         .with_state(renderer);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//!
//! async fn index(mut render: Render) -> Render {
//!     render.html(StatusCode::OK, "index", &context! { title => "Home" }, None);
//!     render
//! }
//!
//! async fn api(mut render: Render) -> Render {
//!     render.json(StatusCode::OK, &json!({ "ok": true }));
//!     render
//! }
//! ```
//!
//! # Modes
//!
//! In development (`ACTON_ENV` unset or anything other than `production`)
//! template sets are recompiled on every HTML render. In production the
//! compiled sets are cached.

// Lint configuration is handled at the workspace level in Cargo.toml
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod observability;
pub mod pool;
pub mod render;
pub mod response;
pub mod template;

pub mod prelude {
    //! Convenience re-exports for common types and traits
    //!
    //! # Examples
    //!
    //! ```rust
    //! use acton_render::prelude::*;
    //! ```

    pub use crate::config::{HtmlOptions, Mode, RenderConfig, RenderOptions};
    pub use crate::error::RenderError;
    pub use crate::render::{LoadTimes, Render, Renderer};
    pub use crate::response::{ResponseBuffer, ResponseWriter};
    pub use crate::template::{FuncMap, TemplateSets};

    // Re-export key dependencies
    pub use axum;
    pub use axum::http::StatusCode;
    pub use minijinja::context;

    // Convenience for JSON responses
    pub use serde_json::json;
}
