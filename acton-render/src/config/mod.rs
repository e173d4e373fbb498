//! Configuration for template sets and response rendering
//!
//! Every template set is described by one [`RenderOptions`]. Options may be
//! built in code or loaded from configuration sources with clear precedence:
//!
//! 1. Environment variables (highest priority, `ACTON_RENDER_` prefix)
//! 2. `./config.toml` (`[render]` table)
//! 3. Hardcoded defaults (fallback)
//!
//! # Example Configuration
//!
//! ```toml
//! # config.toml
//! [[render.sets]]
//! directory = "./templates"
//! layout = "layout"
//! charset = "UTF-8"
//! indent_json = true
//!
//! [[render.sets]]
//! name = "admin"
//! directory = "./admin/templates"
//! extensions = [".html"]
//! prefix_json = ")]}',\n"
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use acton_render::config::RenderConfig;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = RenderConfig::load()?;
//! for set in &config.sets {
//!     println!("{} -> {}", set.name, set.directory.display());
//! }
//! # Ok(())
//! # }
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::template::FuncMap;

/// Name of the template set used when none is given
pub const DEFAULT_SET_NAME: &str = "DEFAULT";

/// Default template directory
pub const DEFAULT_DIRECTORY: &str = "templates";

/// Default template file extensions
pub const DEFAULT_EXTENSIONS: [&str; 2] = [".tmpl", ".html"];

/// Charset appended to content types when none is configured
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// Environment variable holding the process mode
pub const MODE_ENV_VAR: &str = "ACTON_ENV";

/// Left and right delimiters for template variable expressions
///
/// Empty values fall back to the engine's `{{` and `}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delims {
    /// Left delimiter, defaults to `{{`
    pub left: String,
    /// Right delimiter, defaults to `}}`
    pub right: String,
}

impl Delims {
    /// Create a delimiter pair
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }

    /// Whether both delimiters are left at the engine default
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }
}

/// Configuration of one named template set
///
/// Partially filled options are completed by [`RenderOptions::resolve`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Name of the template set, empty means [`DEFAULT_SET_NAME`]
    pub name: String,

    /// Directory to load templates from, defaults to `templates`
    pub directory: PathBuf,

    /// Layout template name, no layout is rendered when empty
    pub layout: String,

    /// Extensions to parse template files from, defaults to `.tmpl` and `.html`
    pub extensions: Vec<String>,

    /// Helper function tables installed into every template, in order
    #[serde(skip)]
    pub funcs: Vec<FuncMap>,

    /// Variable delimiters
    pub delims: Delims,

    /// Charset appended to the `Content-Type` header, defaults to `UTF-8`
    pub charset: String,

    /// Output human readable JSON
    pub indent_json: bool,

    /// Output human readable XML
    pub indent_xml: bool,

    /// Bytes written ahead of every JSON body
    #[serde(with = "prefix_bytes")]
    pub prefix_json: Vec<u8>,

    /// Bytes written ahead of every XML body
    #[serde(with = "prefix_bytes")]
    pub prefix_xml: Vec<u8>,

    /// Content type of HTML output, defaults to `text/html`
    pub html_content_type: String,
}

impl RenderOptions {
    /// Create options for a named set with every other field defaulted
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the template directory
    #[must_use]
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Set the default layout
    #[must_use]
    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Replace the extension allow-list
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Append a helper function table
    #[must_use]
    pub fn with_funcs(mut self, funcs: FuncMap) -> Self {
        self.funcs.push(funcs);
        self
    }

    /// Set the variable delimiters
    #[must_use]
    pub fn with_delims(mut self, delims: Delims) -> Self {
        self.delims = delims;
        self
    }

    /// Set the charset
    #[must_use]
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Enable pretty JSON output
    #[must_use]
    pub const fn with_indent_json(mut self, indent: bool) -> Self {
        self.indent_json = indent;
        self
    }

    /// Enable pretty XML output
    #[must_use]
    pub const fn with_indent_xml(mut self, indent: bool) -> Self {
        self.indent_xml = indent;
        self
    }

    /// Set the JSON body prefix
    #[must_use]
    pub fn with_prefix_json(mut self, prefix: impl Into<Vec<u8>>) -> Self {
        self.prefix_json = prefix.into();
        self
    }

    /// Set the XML body prefix
    #[must_use]
    pub fn with_prefix_xml(mut self, prefix: impl Into<Vec<u8>>) -> Self {
        self.prefix_xml = prefix.into();
        self
    }

    /// Set the HTML content type
    #[must_use]
    pub fn with_html_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.html_content_type = content_type.into();
        self
    }

    /// Fill every unset field with its default
    ///
    /// Directory existence is not checked here; that happens at compilation.
    #[must_use]
    pub fn resolve(mut self) -> Self {
        if self.name.is_empty() {
            self.name = DEFAULT_SET_NAME.to_string();
        }
        if self.directory.as_os_str().is_empty() {
            self.directory = PathBuf::from(DEFAULT_DIRECTORY);
        }
        if self.extensions.is_empty() {
            self.extensions = DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect();
        }
        if self.html_content_type.is_empty() {
            self.html_content_type = crate::response::CONTENT_HTML.to_string();
        }
        self
    }

    /// The `; charset=...` suffix appended to content types
    #[must_use]
    pub fn charset_suffix(&self) -> String {
        if self.charset.is_empty() {
            format!("; charset={DEFAULT_CHARSET}")
        } else {
            format!("; charset={}", self.charset)
        }
    }
}

/// Per-call override of HTML rendering options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlOptions {
    /// Layout template name, overrides [`RenderOptions::layout`]
    pub layout: String,
}

impl HtmlOptions {
    /// Render inside the given layout
    pub fn layout(layout: impl Into<String>) -> Self {
        Self {
            layout: layout.into(),
        }
    }

    /// Render without any layout, even if the set configures one
    #[must_use]
    pub fn no_layout() -> Self {
        Self::default()
    }
}

/// Process mode deciding whether templates are recompiled per render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Templates are recompiled on every HTML render
    Development,
    /// Compiled templates are cached for the life of the process
    Production,
}

impl Mode {
    /// Read the mode from `ACTON_ENV`
    ///
    /// `production` and `prod` select production; anything else, including an
    /// unset variable, selects development.
    #[must_use]
    pub fn current() -> Self {
        std::env::var(MODE_ENV_VAR).map_or(Self::Development, |value| Self::parse(&value))
    }

    /// Parse a mode name
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    /// Whether templates should be recompiled before rendering
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Settings for every template set of an application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Template sets to register, the first one is the application default
    pub sets: Vec<RenderOptions>,

    /// Fixed process mode, read from `ACTON_ENV` per render when unset
    pub mode: Option<Mode>,
}

/// Wrapper matching the `[render]` table of `config.toml`
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    render: RenderConfig,
}

impl RenderConfig {
    /// Load configuration from `./config.toml` and `ACTON_RENDER_*` variables
    ///
    /// # Errors
    ///
    /// Returns an error if the merged sources do not deserialize into a
    /// `RenderConfig`.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from("config.toml")
    }

    /// Load configuration from a specific file merged with the environment
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use acton_render::config::RenderConfig;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = RenderConfig::load_from("./config/production.toml")?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the file is not valid TOML or a value has the
    /// wrong type. A missing file is not an error.
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("ACTON_RENDER_").split("__").map(|key| {
                format!("render.{}", key.as_str()).into()
            }));
        Self::extract(&figment)
    }

    /// Parse configuration from a TOML string
    ///
    /// # Errors
    ///
    /// Returns an error if `source` is not valid TOML or does not match the
    /// `[render]` table layout.
    pub fn from_toml(source: &str) -> anyhow::Result<Self> {
        let figment = Figment::new().merge(Toml::string(source));
        Self::extract(&figment)
    }

    fn extract(figment: &Figment) -> anyhow::Result<Self> {
        let file: ConfigFile = figment.extract()?;
        Ok(file.render)
    }
}

/// Prefix bytes are written in configuration files as plain strings
mod prefix_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        String::deserialize(deserializer).map(String::into_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_fills_defaults() {
        let opts = RenderOptions::default().resolve();
        assert_eq!(opts.name, DEFAULT_SET_NAME);
        assert_eq!(opts.directory, PathBuf::from("templates"));
        assert_eq!(opts.extensions, vec![".tmpl", ".html"]);
        assert_eq!(opts.html_content_type, "text/html");
        assert!(opts.layout.is_empty());
        assert!(opts.delims.is_default());
    }

    #[test]
    fn test_resolve_keeps_explicit_values() {
        let opts = RenderOptions::named("admin")
            .with_directory("admin/views")
            .with_extensions([".jinja"])
            .with_html_content_type("application/xhtml+xml")
            .resolve();
        assert_eq!(opts.name, "admin");
        assert_eq!(opts.directory, PathBuf::from("admin/views"));
        assert_eq!(opts.extensions, vec![".jinja"]);
        assert_eq!(opts.html_content_type, "application/xhtml+xml");
    }

    #[test]
    fn test_charset_suffix() {
        assert_eq!(RenderOptions::default().charset_suffix(), "; charset=UTF-8");
        assert_eq!(
            RenderOptions::default().with_charset("ISO-8859-1").charset_suffix(),
            "; charset=ISO-8859-1"
        );
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(Mode::parse("production"), Mode::Production);
        assert_eq!(Mode::parse("PROD"), Mode::Production);
        assert_eq!(Mode::parse("development"), Mode::Development);
        assert_eq!(Mode::parse(""), Mode::Development);
        assert!(Mode::Development.is_development());
    }

    #[test]
    fn test_config_from_toml() {
        let config = RenderConfig::from_toml(
            r#"
            [render]
            mode = "production"

            [[render.sets]]
            directory = "./views"
            layout = "layout"
            indent_json = true
            prefix_json = "while(1);"

            [[render.sets]]
            name = "admin"
            extensions = [".html"]
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, Some(Mode::Production));
        assert_eq!(config.sets.len(), 2);
        assert_eq!(config.sets[0].directory, PathBuf::from("./views"));
        assert_eq!(config.sets[0].layout, "layout");
        assert!(config.sets[0].indent_json);
        assert_eq!(config.sets[0].prefix_json, b"while(1);");
        assert_eq!(config.sets[1].name, "admin");
        assert!(config.sets[1].funcs.is_empty());
    }

    #[test]
    fn test_config_defaults_when_empty() {
        let config = RenderConfig::from_toml("").unwrap();
        assert!(config.sets.is_empty());
        assert!(config.mode.is_none());
    }
}
