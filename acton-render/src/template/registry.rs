//! Registry of compiled template sets
//!
//! Maps set names to their resolved [`RenderOptions`] and to the compiled
//! environment. Both maps sit behind one read/write lock: lookups take the
//! read side, installing a compiled set or changing a set's directory takes
//! the write side. Compilation itself runs outside the lock and the result is
//! swapped in whole, so readers see either the old or the new set.

use minijinja::Environment;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::compiler;
use crate::{
    config::{RenderOptions, DEFAULT_SET_NAME},
    error::RenderError,
};

static GLOBAL: Lazy<TemplateSets> = Lazy::new(TemplateSets::new);

#[derive(Debug, Default)]
struct Sets {
    compiled: HashMap<String, Arc<Environment<'static>>>,
    options: HashMap<String, RenderOptions>,
}

/// Shared registry of template sets
///
/// Cloning is cheap and clones share state. Tests and embedded applications
/// create their own instance with [`TemplateSets::new`]; applications that
/// want one process-wide registry use [`TemplateSets::global`].
#[derive(Debug, Clone, Default)]
pub struct TemplateSets {
    inner: Arc<RwLock<Sets>>,
}

impl TemplateSets {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Resolve `options` and record them under their name
    ///
    /// Replaces options previously registered under the same name.
    pub fn prepare(&self, options: RenderOptions) -> RenderOptions {
        let options = options.resolve();
        self.inner
            .write()
            .options
            .insert(options.name.clone(), options.clone());
        options
    }

    /// Compile a set from `options` and install it under `options.name`
    ///
    /// # Errors
    ///
    /// Returns the compilation error; the previously installed set, if any,
    /// stays in place.
    pub fn compile_options(&self, options: &RenderOptions) -> Result<(), RenderError> {
        let env = compiler::compile(options)?;
        let templates = env.templates().count();

        self.inner
            .write()
            .compiled
            .insert(options.name.clone(), Arc::new(env));

        tracing::debug!(
            set = %options.name,
            directory = %options.directory.display(),
            templates,
            "template set compiled"
        );
        Ok(())
    }

    /// Recompile a registered set from its stored options
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UndefinedSet`] if no options are registered
    /// under `name`, or the compilation error.
    pub fn compile(&self, name: &str) -> Result<(), RenderError> {
        let options = self
            .options(name)
            .ok_or_else(|| RenderError::UndefinedSet {
                template: name.to_string(),
            })?;
        self.compile_options(&options)
    }

    /// Compiled environment of a set
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Environment<'static>>> {
        self.inner.read().compiled.get(name).cloned()
    }

    /// Registered options of a set
    #[must_use]
    pub fn options(&self, name: &str) -> Option<RenderOptions> {
        self.inner.read().options.get(name).cloned()
    }

    /// Whether a compiled set exists under `name`
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().compiled.contains_key(name)
    }

    /// Names of all compiled sets, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().compiled.keys().cloned().collect();
        names.sort();
        names
    }

    /// Point a set at a new directory and recompile it
    ///
    /// An empty `set_name` selects the default set. Only that set is
    /// recompiled. Renders running concurrently may still use the old set.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UndefinedSet`] if the set was never registered,
    /// or the compilation error.
    pub fn set_template_path(
        &self,
        set_name: &str,
        directory: impl Into<PathBuf>,
    ) -> Result<(), RenderError> {
        let name = if set_name.is_empty() {
            DEFAULT_SET_NAME
        } else {
            set_name
        };

        let options = {
            let mut sets = self.inner.write();
            let options =
                sets.options
                    .get_mut(name)
                    .ok_or_else(|| RenderError::UndefinedSet {
                        template: name.to_string(),
                    })?;
            options.directory = directory.into();
            options.clone()
        };

        tracing::info!(
            set = %name,
            directory = %options.directory.display(),
            "template path changed"
        );
        self.compile_options(&options)
    }
}
