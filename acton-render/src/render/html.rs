//! HTML responses from compiled template sets

use axum::http::StatusCode;
use minijinja::Value;
use serde::Serialize;
use std::sync::Arc;

use super::Render;
use crate::{
    config::{HtmlOptions, DEFAULT_SET_NAME},
    error::RenderError,
    response::ResponseWriter,
    template::helpers,
};

impl<W: ResponseWriter> Render<W> {
    /// Render template `name` of the default set and write it as HTML
    ///
    /// `options` overrides the set's layout for this call. Failures become a
    /// 500 response carrying the error text.
    pub fn html<T: Serialize + ?Sized>(
        &mut self,
        status: StatusCode,
        name: &str,
        data: &T,
        options: Option<&HtmlOptions>,
    ) {
        self.html_set(status, DEFAULT_SET_NAME, name, data, options);
    }

    /// Render template `name` of set `set_name` and write it as HTML
    pub fn html_set<T: Serialize + ?Sized>(
        &mut self,
        status: StatusCode,
        set_name: &str,
        name: &str,
        data: &T,
        options: Option<&HtmlOptions>,
    ) {
        self.load_times.start();

        let mut buf = self.renderer.pool.acquire();
        if let Err(err) = self.render_bytes(set_name, name, data, options, &mut buf) {
            self.fail(&err);
            return;
        }

        let options = Arc::clone(&self.renderer.options);
        self.set_content_type(&options.html_content_type);
        self.writer.write_status(status);
        self.writer.write(&buf);
    }

    /// Render template `name` of the default set into a string
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UndefinedSet`] for an unknown set and
    /// [`RenderError::Execute`] when the template fails.
    pub fn html_string<T: Serialize + ?Sized>(
        &self,
        name: &str,
        data: &T,
        options: Option<&HtmlOptions>,
    ) -> Result<String, RenderError> {
        self.html_set_string(DEFAULT_SET_NAME, name, data, options)
    }

    /// Render template `name` of set `set_name` into a string
    ///
    /// # Errors
    ///
    /// See [`Render::html_string`].
    pub fn html_set_string<T: Serialize + ?Sized>(
        &self,
        set_name: &str,
        name: &str,
        data: &T,
        options: Option<&HtmlOptions>,
    ) -> Result<String, RenderError> {
        let mut buf = self.renderer.pool.acquire();
        self.render_bytes(set_name, name, data, options, &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn render_bytes<T: Serialize + ?Sized>(
        &self,
        set_name: &str,
        name: &str,
        data: &T,
        options: Option<&HtmlOptions>,
        out: &mut Vec<u8>,
    ) -> Result<(), RenderError> {
        let sets = &self.renderer.sets;
        let set_options = sets.options(set_name);

        if self.renderer.mode().is_development() && set_options.is_some() {
            tracing::trace!(set = %set_name, "recompiling template set");
            sets.compile(set_name)?;
        }

        let env = sets.get(set_name).ok_or_else(|| RenderError::UndefinedSet {
            template: name.to_string(),
        })?;

        let layout = match options {
            Some(options) => options.layout.clone(),
            None => self.renderer.options.layout.clone(),
        };

        let data = Value::from_serialize(data);
        let (target, ctx) = if layout.is_empty() {
            (name, data)
        } else {
            let ctx = helpers::layout_context(&data, name, &self.renderer.pool);
            (layout.as_str(), ctx)
        };

        env.get_template(target)?.render_captured_to(ctx, out)?;
        Ok(())
    }
}
