//! Per-request response rendering
//!
//! [`Renderer`] is built once per application: it resolves the template set
//! options, compiles the set and then hands out one [`Render`] per request.
//! A [`Render`] writes JSON, XML, raw bytes or templated HTML into its
//! [`ResponseWriter`].
//!
//! # Example
//!
//! ```rust,no_run
//! use acton_render::prelude::*;
//! use axum::{routing::get, Router};
//!
//! async fn index(mut render: Render) -> Render {
//!     render.html(StatusCode::OK, "index", &context! { title => "Home" }, None);
//!     render
//! }
//!
//! # async fn example() -> anyhow::Result<()> {
//! let renderer = Renderer::new(
//!     RenderOptions::default()
//!         .with_directory("templates")
//!         .with_layout("layout"),
//! )?;
//!
//! let app: Router = Router::new()
//!     .route("/", get(index))
//!     .with_state(renderer);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

mod data;
mod extract;
mod html;

use axum::http::{Method, Uri};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    config::{Mode, RenderConfig, RenderOptions},
    error::RenderError,
    pool::BufferPool,
    response::{ResponseBuffer, ResponseWriter},
    template::TemplateSets,
};

/// Per-application renderer factory
///
/// Cheap to clone; use it as (part of) the axum router state.
#[derive(Debug, Clone)]
pub struct Renderer {
    sets: TemplateSets,
    options: Arc<RenderOptions>,
    charset: Arc<str>,
    pool: BufferPool,
    mode: Option<Mode>,
}

impl Renderer {
    /// Create a renderer on the process-wide registry
    ///
    /// # Errors
    ///
    /// Returns the compilation error of the initial template set. Callers
    /// should treat it as fatal for startup.
    pub fn new(options: RenderOptions) -> Result<Self, RenderError> {
        Self::with_sets(TemplateSets::global().clone(), options)
    }

    /// Create a renderer on the given registry
    ///
    /// Resolves and registers `options`, then compiles the set.
    ///
    /// # Errors
    ///
    /// Returns the compilation error of the initial template set.
    pub fn with_sets(sets: TemplateSets, options: RenderOptions) -> Result<Self, RenderError> {
        let options = sets.prepare(options);
        sets.compile_options(&options)?;
        let charset = options.charset_suffix();

        Ok(Self {
            sets,
            options: Arc::new(options),
            charset: charset.into(),
            pool: BufferPool::default(),
            mode: None,
        })
    }

    /// Create one renderer per configured set on the given registry
    ///
    /// An empty configuration yields a single renderer for the default set.
    ///
    /// # Errors
    ///
    /// Returns the first compilation error.
    pub fn from_config(sets: &TemplateSets, config: &RenderConfig) -> Result<Vec<Self>, RenderError> {
        let configured = if config.sets.is_empty() {
            vec![RenderOptions::default()]
        } else {
            config.sets.clone()
        };

        configured
            .into_iter()
            .map(|options| {
                let renderer = Self::with_sets(sets.clone(), options)?;
                Ok(match config.mode {
                    Some(mode) => renderer.with_mode(mode),
                    None => renderer,
                })
            })
            .collect()
    }

    /// Use a fixed mode instead of reading `ACTON_ENV` on each render
    #[must_use]
    pub const fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Use a specific buffer pool
    #[must_use]
    pub fn with_pool(mut self, pool: BufferPool) -> Self {
        self.pool = pool;
        self
    }

    /// Resolved options of the bound set
    #[must_use]
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Registry this renderer reads from
    #[must_use]
    pub const fn sets(&self) -> &TemplateSets {
        &self.sets
    }

    /// The `; charset=...` suffix added to content types
    #[must_use]
    pub fn charset(&self) -> &str {
        &self.charset
    }

    /// Mode in effect for the next render
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode.unwrap_or_else(Mode::current)
    }

    /// Build the renderer for one request
    #[must_use]
    pub fn render<W: ResponseWriter>(&self, writer: W, method: Method, uri: Uri) -> Render<W> {
        Render {
            writer,
            method,
            uri,
            renderer: self.clone(),
            load_times: LoadTimes::default(),
        }
    }

    /// Point a set at a new directory and recompile it
    ///
    /// # Errors
    ///
    /// See [`TemplateSets::set_template_path`].
    pub fn set_template_path(
        &self,
        set_name: &str,
        directory: impl Into<std::path::PathBuf>,
    ) -> Result<(), RenderError> {
        self.sets.set_template_path(set_name, directory)
    }
}

/// Elapsed template time of one request
///
/// Unset until the first HTML render. Clones share the same start time.
#[derive(Debug, Clone, Default)]
pub struct LoadTimes(Arc<Mutex<Option<Instant>>>);

impl LoadTimes {
    fn start(&self) {
        *self.0.lock() = Some(Instant::now());
    }

    /// Milliseconds since the last HTML render started, as `"<n>ms"`
    ///
    /// Empty when no HTML render happened.
    #[must_use]
    pub fn elapsed(&self) -> String {
        self.0
            .lock()
            .map(|start| format!("{}ms", start.elapsed().as_millis()))
            .unwrap_or_default()
    }
}

impl fmt::Display for LoadTimes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.elapsed())
    }
}

/// Renderer bound to one request and its output sink
#[derive(Debug)]
pub struct Render<W = ResponseBuffer> {
    writer: W,
    method: Method,
    uri: Uri,
    renderer: Renderer,
    load_times: LoadTimes,
}

impl<W: ResponseWriter> Render<W> {
    /// The underlying output sink
    #[must_use]
    pub const fn writer(&self) -> &W {
        &self.writer
    }

    /// The underlying output sink, mutably
    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consume the renderer and return its sink
    #[must_use]
    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Resolved options of the bound set
    #[must_use]
    pub fn options(&self) -> &RenderOptions {
        self.renderer.options()
    }

    /// Template timing of this request
    #[must_use]
    pub const fn load_times(&self) -> &LoadTimes {
        &self.load_times
    }

    /// Point a set at a new directory and recompile it
    ///
    /// # Errors
    ///
    /// See [`TemplateSets::set_template_path`].
    pub fn set_template_path(
        &self,
        set_name: &str,
        directory: impl Into<std::path::PathBuf>,
    ) -> Result<(), RenderError> {
        self.renderer.set_template_path(set_name, directory)
    }
}
