//! Template helper functions
//!
//! Every compiled template set carries two built-in helpers:
//!
//! - `yield()` renders the content template from inside a layout. Outside a
//!   layout it fails with "yield called with no layout defined".
//! - `current()` returns the name of the content template being rendered
//!   inside a layout, or the empty string.
//!
//! Both may also be printed without parentheses, `{{ yield }}` renders the
//! same as `{{ yield() }}`. The layout versions of both helpers are bound per
//! render through the execution context, so the compiled set itself is never
//! mutated.
//!
//! Applications add their own helpers as [`FuncMap`] tables:
//!
//! ```rust
//! use acton_render::config::RenderOptions;
//! use acton_render::template::FuncMap;
//! use minijinja::Value;
//!
//! let mut funcs = FuncMap::new();
//! funcs.insert(
//!     "shout".to_string(),
//!     Value::from_function(|s: &str| s.to_uppercase()),
//! );
//!
//! let options = RenderOptions::default().with_funcs(funcs);
//! assert_eq!(options.funcs.len(), 1);
//! ```

use minijinja::{
    escape_formatter,
    value::{Object, Value, ValueKind},
    Environment, Error, ErrorKind, Output, State,
};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::pool::BufferPool;

/// Table of named helper functions installed into a template set
pub type FuncMap = BTreeMap<String, Value>;

/// Name of the content helper
pub const YIELD_FN: &str = "yield";

/// Name of the content-name helper
pub const CURRENT_FN: &str = "current";

/// Install helper tables followed by the built-in `yield` and `current`
///
/// Built-ins are installed last and win over helpers of the same name.
pub(crate) fn install(env: &mut Environment<'static>, tables: &[FuncMap]) {
    for table in tables {
        for (name, func) in table {
            env.add_global(name.clone(), func.clone());
        }
    }
    env.add_global(YIELD_FN, Value::from_object(LayoutHelper::Unbound));
    env.add_global(CURRENT_FN, Value::from_object(LayoutHelper::Name(String::new())));
    env.set_formatter(format_value);
}

/// Per-render `yield` and `current`
///
/// Works both called, `{{ yield() }}`, and printed bare, `{{ yield }}`.
#[derive(Debug)]
enum LayoutHelper {
    /// `yield` outside a layout
    Unbound,
    /// `yield` inside a layout, rendering `name` with `ctx`
    Content {
        name: String,
        ctx: Value,
        pool: BufferPool,
    },
    /// `current`
    Name(String),
}

impl LayoutHelper {
    fn invoke(&self, state: &State<'_, '_>) -> Result<Value, Error> {
        match self {
            Self::Unbound => Err(Error::new(
                ErrorKind::InvalidOperation,
                "yield called with no layout defined",
            )),
            Self::Content { name, ctx, pool } => {
                let template = state.env().get_template(name)?;
                let mut buf = pool.acquire();
                template.render_captured_to(ctx.clone(), &mut *buf)?;
                // Output of our own templates, already escaped
                Ok(Value::from_safe_string(
                    String::from_utf8_lossy(&buf).into_owned(),
                ))
            }
            Self::Name(name) => Ok(Value::from(name.as_str())),
        }
    }
}

impl Object for LayoutHelper {
    fn call(self: &Arc<Self>, state: &State<'_, '_>, args: &[Value]) -> Result<Value, Error> {
        if !args.is_empty() {
            return Err(Error::new(
                ErrorKind::TooManyArguments,
                "layout helpers take no arguments",
            ));
        }
        self.invoke(state)
    }
}

/// Output formatter printing bare layout helpers as their result
fn format_value(out: &mut Output<'_>, state: &State<'_, '_>, value: &Value) -> Result<(), Error> {
    match value.downcast_object_ref::<LayoutHelper>() {
        Some(helper) => escape_formatter(out, state, &helper.invoke(state)?),
        None => escape_formatter(out, state, value),
    }
}

/// Execution context for a layout wrapping `content`
///
/// Adds `yield` and `current` bound to this render on top of `data`.
pub(crate) fn layout_context(data: &Value, content: &str, pool: &BufferPool) -> Value {
    let current = Value::from_object(LayoutHelper::Name(content.to_string()));
    let content_ctx = with_bindings(data, [(CURRENT_FN, current.clone())]);
    let content = LayoutHelper::Content {
        name: content.to_string(),
        ctx: content_ctx,
        pool: pool.clone(),
    };
    with_bindings(
        data,
        [(YIELD_FN, Value::from_object(content)), (CURRENT_FN, current)],
    )
}

/// Copy the entries of `data` into a fresh map and overlay `bindings`
///
/// Non-map data contributes nothing.
fn with_bindings<const N: usize>(data: &Value, bindings: [(&str, Value); N]) -> Value {
    let mut ctx = BTreeMap::new();
    if data.kind() == ValueKind::Map {
        if let Ok(keys) = data.try_iter() {
            for key in keys {
                if let Ok(value) = data.get_item(&key) {
                    ctx.insert(key.to_string(), value);
                }
            }
        }
    }
    for (name, value) in bindings {
        ctx.insert(name.to_string(), value);
    }
    Value::from(ctx)
}

// =============================================================================
// HTMX Attribute Helpers
// =============================================================================

/// Helper table generating HTMX attributes from templates
///
/// Provides `hx_get(url, target, swap)`, `hx_post(url, target, swap)`,
/// `hx_trigger(trigger)`, `hx_target(selector)`, `hx_swap(strategy)`,
/// `hx_confirm(message)` and `hx_boost()`. Attribute values are escaped.
///
/// # Examples
///
/// ```rust
/// use acton_render::config::RenderOptions;
/// use acton_render::template::helpers::htmx_funcs;
///
/// let options = RenderOptions::default().with_funcs(htmx_funcs());
/// assert!(options.funcs[0].contains_key("hx_post"));
/// ```
#[must_use]
pub fn htmx_funcs() -> FuncMap {
    let mut funcs = FuncMap::new();
    funcs.insert(
        "hx_get".to_string(),
        Value::from_function(|url: &str, target: &str, swap: &str| {
            request_attrs("hx-get", url, target, swap)
        }),
    );
    funcs.insert(
        "hx_post".to_string(),
        Value::from_function(|url: &str, target: &str, swap: &str| {
            request_attrs("hx-post", url, target, swap)
        }),
    );
    funcs.insert(
        "hx_trigger".to_string(),
        Value::from_function(|trigger: &str| attr("hx-trigger", trigger)),
    );
    funcs.insert(
        "hx_target".to_string(),
        Value::from_function(|selector: &str| attr("hx-target", selector)),
    );
    funcs.insert(
        "hx_swap".to_string(),
        Value::from_function(|strategy: &str| attr("hx-swap", strategy)),
    );
    funcs.insert(
        "hx_confirm".to_string(),
        Value::from_function(|message: &str| attr("hx-confirm", message)),
    );
    funcs.insert(
        "hx_boost".to_string(),
        Value::from_function(|| Value::from_safe_string(r#"hx-boost="true""#.to_string())),
    );
    funcs
}

fn attr(name: &str, value: &str) -> Value {
    Value::from_safe_string(format!(r#"{name}="{}""#, escape_attr(value)))
}

fn request_attrs(verb: &str, url: &str, target: &str, swap: &str) -> Value {
    Value::from_safe_string(format!(
        r#"{verb}="{}" hx-target="{}" hx-swap="{}""#,
        escape_attr(url),
        escape_attr(target),
        escape_attr(swap)
    ))
}

/// Escape a string for use inside a double-quoted HTML attribute
#[must_use]
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::{context, AutoEscape};

    fn env_with(templates: &[(&'static str, &'static str)]) -> Environment<'static> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        install(&mut env, &[htmx_funcs()]);
        for &(name, source) in templates {
            env.add_template(name, source).unwrap();
        }
        env
    }

    #[test]
    fn test_yield_without_layout_fails() {
        let env = env_with(&[("page", "{{ yield() }}")]);
        let err = env.get_template("page").unwrap().render(()).unwrap_err();
        assert!(err.to_string().contains("no layout defined"));
    }

    #[test]
    fn test_current_without_layout_is_empty() {
        let env = env_with(&[("page", "[{{ current() }}]")]);
        let out = env.get_template("page").unwrap().render(()).unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn test_layout_context_binds_yield_and_current() {
        let env = env_with(&[
            ("layout", "<main data-page=\"{{ current() }}\">{{ yield() }}</main>"),
            ("content", "<p>{{ title }}</p>"),
        ]);
        let data = context! { title => "Hi" };
        let ctx = layout_context(&data, "content", &BufferPool::default());

        let out = env.get_template("layout").unwrap().render(ctx).unwrap();
        assert_eq!(out, "<main data-page=\"content\"><p>Hi</p></main>");
    }

    #[test]
    fn test_yield_output_is_not_escaped_twice() {
        let env = env_with(&[
            ("layout", "{{ yield() }}"),
            ("content", "<b>{{ text }}</b>"),
        ]);
        let data = context! { text => "a<b" };
        let ctx = layout_context(&data, "content", &BufferPool::default());

        let out = env.get_template("layout").unwrap().render(ctx).unwrap();
        assert_eq!(out, "<b>a&lt;b</b>");
    }

    #[test]
    fn test_bare_yield_and_current_render_output() {
        let env = env_with(&[
            ("layout", "<html data-page=\"{{ current }}\">{{yield}}</html>"),
            ("content", "<p>{{ title }}</p>"),
        ]);
        let data = context! { title => "Hi" };
        let ctx = layout_context(&data, "content", &BufferPool::default());

        let out = env.get_template("layout").unwrap().render(ctx).unwrap();
        assert_eq!(out, "<html data-page=\"content\"><p>Hi</p></html>");
    }

    #[test]
    fn test_bare_yield_without_layout_fails() {
        let env = env_with(&[("page", "<html>{{ yield }}</html>"), ("named", "[{{ current }}]")]);
        let err = env.get_template("page").unwrap().render(()).unwrap_err();
        assert!(err.to_string().contains("no layout defined"));

        let out = env.get_template("named").unwrap().render(()).unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn test_layout_helpers_reject_arguments() {
        let env = env_with(&[("page", "{{ current(1) }}")]);
        assert!(env.get_template("page").unwrap().render(()).is_err());
    }

    #[test]
    fn test_bindings_override_data() {
        let data = context! { current => "shadowed", keep => 1 };
        let ctx = with_bindings(&data, [(CURRENT_FN, Value::from("bound"))]);
        assert_eq!(ctx.get_attr("current").unwrap().as_str(), Some("bound"));
        assert_eq!(ctx.get_attr("keep").unwrap(), Value::from(1));
    }

    #[test]
    fn test_htmx_funcs() {
        let env = env_with(&[(
            "form",
            r##"<form {{ hx_post("/items", "#list", "innerHTML") }} {{ hx_confirm("Sure?") }}>"##,
        )]);
        let out = env.get_template("form").unwrap().render(()).unwrap();
        assert_eq!(
            out,
            r##"<form hx-post="/items" hx-target="#list" hx-swap="innerHTML" hx-confirm="Sure?">"##
        );
    }

    #[test]
    fn test_escape_attr() {
        assert_eq!(escape_attr(r#"a"b<c>&'"#), "a&#34;b&lt;c&gt;&amp;&#39;");
    }
}
