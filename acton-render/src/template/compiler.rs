//! Template set compilation
//!
//! A template set is compiled by walking its directory and parsing every file
//! whose extension is in the allow-list into one minijinja environment. The
//! template name is the path relative to the set root with the extension
//! stripped and separators normalized to `/`, so `sub/dir/page.tmpl`
//! registers as `sub/dir/page` on every platform.
//!
//! Any unreadable file, unreadable directory or syntax error fails the whole
//! compilation: broken templates must surface at startup (or at an explicit
//! recompilation), never in the middle of a request.

use minijinja::{syntax::SyntaxConfig, AutoEscape, Environment};
use std::path::Path;
use walkdir::WalkDir;

use super::helpers;
use crate::{
    config::{Delims, RenderOptions},
    error::RenderError,
};

/// Body of the placeholder template keeping a set non-empty
pub const PLACEHOLDER_SOURCE: &str = "acton-render";

/// Compile the template set described by `options`
///
/// The returned environment contains the placeholder template (named after
/// the directory), one template per matching file, the configured helper
/// tables and the built-in `yield` and `current` helpers. Files are visited
/// in file-name order; two files mapping to the same name resolve to the one
/// visited last.
///
/// A directory that does not exist compiles to an empty set.
///
/// # Errors
///
/// Returns [`RenderError::Walk`], [`RenderError::Read`] or
/// [`RenderError::Parse`] for the first failing entry, and
/// [`RenderError::InvalidDelims`] when the delimiters are rejected.
pub fn compile(options: &RenderOptions) -> Result<Environment<'static>, RenderError> {
    let dir = options.directory.as_path();
    let mut env = Environment::new();

    apply_delims(&mut env, &options.delims)?;
    env.set_auto_escape_callback(|_| AutoEscape::Html);
    helpers::install(&mut env, &options.funcs);

    let root = dir.to_string_lossy().into_owned();
    env.add_template_owned(root.clone(), PLACEHOLDER_SOURCE)
        .map_err(|source| RenderError::Parse { name: root, source })?;

    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if is_missing_root(&err) => {
                tracing::warn!(directory = %dir.display(), "template directory does not exist");
                break;
            }
            Err(err) => return Err(err.into()),
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Some(ext) = entry
            .file_name()
            .to_str()
            .and_then(|file_name| matched_extension(file_name, &options.extensions))
        else {
            continue;
        };

        let relative = entry.path().strip_prefix(dir).unwrap_or_else(|_| entry.path());
        let name = template_name(relative, ext);

        let source = std::fs::read_to_string(entry.path()).map_err(|source| RenderError::Read {
            path: entry.path().to_path_buf(),
            source,
        })?;

        tracing::trace!(template = %name, path = %entry.path().display(), "parsing template");
        env.add_template_owned(name.clone(), source)
            .map_err(|source| RenderError::Parse { name, source })?;
    }

    Ok(env)
}

fn is_missing_root(err: &walkdir::Error) -> bool {
    err.depth() == 0
        && err
            .io_error()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound)
}

fn apply_delims(env: &mut Environment<'static>, delims: &Delims) -> Result<(), RenderError> {
    if delims.is_default() {
        return Ok(());
    }

    let left = if delims.left.is_empty() { "{{" } else { &delims.left };
    let right = if delims.right.is_empty() { "}}" } else { &delims.right };

    let syntax = SyntaxConfig::builder()
        .variable_delimiters(left.to_string(), right.to_string())
        .build()
        .map_err(|source| RenderError::InvalidDelims {
            left: left.to_string(),
            right: right.to_string(),
            source,
        })?;
    env.set_syntax(syntax);
    Ok(())
}

/// Extension of `file_name` if it is in the allow-list
///
/// The extension is everything from the first `.` of the file name, so
/// `page.en.html` has the extension `.en.html`. Matching is exact and
/// case-sensitive.
#[must_use]
pub fn matched_extension<'a, S: AsRef<str>>(file_name: &'a str, allowed: &[S]) -> Option<&'a str> {
    let ext = &file_name[file_name.find('.')?..];
    allowed.iter().any(|a| a.as_ref() == ext).then_some(ext)
}

/// Template name of a file relative to its set root
///
/// Joins the path components with `/` and strips `ext` from the end.
#[must_use]
pub fn template_name(relative: &Path, ext: &str) -> String {
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    match joined.strip_suffix(ext) {
        Some(name) => name.to_string(),
        None => joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;
    use proptest::prelude::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &TempDir, relative: &str, content: &str) {
        let path = dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn options_for(dir: &TempDir) -> RenderOptions {
        RenderOptions::default()
            .with_directory(dir.path())
            .resolve()
    }

    #[test]
    fn test_compiles_matching_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "index.tmpl", "Hello {{ Name }}");

        let env = compile(&options_for(&dir)).unwrap();
        let out = env
            .get_template("index")
            .unwrap()
            .render(context! { Name => "A" })
            .unwrap();
        assert_eq!(out, "Hello A");
    }

    #[test]
    fn test_extension_filter() {
        let dir = TempDir::new().unwrap();
        write(&dir, "notes.txt", "ignored");
        write(&dir, "notes.html", "html");
        write(&dir, "other.tmpl", "tmpl");

        let env = compile(&options_for(&dir)).unwrap();
        assert!(env.get_template("notes").is_ok());
        assert!(env.get_template("other").is_ok());
        assert!(env.get_template("notes.txt").is_err());
    }

    #[test]
    fn test_name_collision_last_in_walk_order_wins() {
        let dir = TempDir::new().unwrap();
        write(&dir, "notes.html", "from html");
        write(&dir, "notes.tmpl", "from tmpl");

        let env = compile(&options_for(&dir)).unwrap();
        let out = env.get_template("notes").unwrap().render(()).unwrap();
        assert_eq!(out, "from tmpl");
    }

    #[test]
    fn test_nested_names_use_forward_slashes() {
        let dir = TempDir::new().unwrap();
        write(&dir, "sub/dir/page.tmpl", "deep");

        let env = compile(&options_for(&dir)).unwrap();
        let out = env.get_template("sub/dir/page").unwrap().render(()).unwrap();
        assert_eq!(out, "deep");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_templates_are_compiled() {
        let shared = TempDir::new().unwrap();
        write(&shared, "card.tmpl", "card");
        write(&shared, "parts/row.tmpl", "row");

        let dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(shared.path().join("card.tmpl"), dir.path().join("card.tmpl"))
            .unwrap();
        std::os::unix::fs::symlink(shared.path().join("parts"), dir.path().join("parts")).unwrap();

        let env = compile(&options_for(&dir)).unwrap();
        assert_eq!(env.get_template("card").unwrap().render(()).unwrap(), "card");
        assert_eq!(env.get_template("parts/row").unwrap().render(()).unwrap(), "row");
    }

    #[test]
    fn test_placeholder_keeps_set_non_empty() {
        let dir = TempDir::new().unwrap();
        let options = options_for(&dir);

        let env = compile(&options).unwrap();
        let root = options.directory.to_string_lossy().into_owned();
        let out = env.get_template(&root).unwrap().render(()).unwrap();
        assert_eq!(out, PLACEHOLDER_SOURCE);
    }

    #[test]
    fn test_missing_directory_compiles_empty_set() {
        let options = RenderOptions::default()
            .with_directory("/definitely/not/here/templates")
            .resolve();
        let env = compile(&options).unwrap();
        assert!(env.get_template("index").is_err());
    }

    #[test]
    fn test_syntax_error_fails_compilation() {
        let dir = TempDir::new().unwrap();
        write(&dir, "good.tmpl", "fine");
        write(&dir, "broken.tmpl", "{% if %}");

        let err = compile(&options_for(&dir)).unwrap_err();
        assert!(matches!(err, RenderError::Parse { ref name, .. } if name == "broken"));
        assert!(err.is_compile_error());
    }

    #[test]
    fn test_custom_delimiters() {
        let dir = TempDir::new().unwrap();
        write(&dir, "page.tmpl", "{{ literal }} [[ name ]]");

        let options = options_for(&dir).with_delims(Delims::new("[[", "]]"));
        let env = compile(&options).unwrap();
        let out = env
            .get_template("page")
            .unwrap()
            .render(context! { name => "x" })
            .unwrap();
        assert_eq!(out, "{{ literal }} x");
    }

    #[test]
    fn test_helper_tables_are_installed() {
        let dir = TempDir::new().unwrap();
        write(&dir, "page.tmpl", "{{ shout('hi') }}");

        let mut funcs = helpers::FuncMap::new();
        funcs.insert(
            "shout".to_string(),
            minijinja::Value::from_function(|s: &str| s.to_uppercase()),
        );
        let env = compile(&options_for(&dir).with_funcs(funcs)).unwrap();
        let out = env.get_template("page").unwrap().render(()).unwrap();
        assert_eq!(out, "HI");
    }

    #[test]
    fn test_output_is_html_escaped() {
        let dir = TempDir::new().unwrap();
        write(&dir, "page.tmpl", "{{ text }}");

        let env = compile(&options_for(&dir)).unwrap();
        let out = env
            .get_template("page")
            .unwrap()
            .render(context! { text => "<script>" })
            .unwrap();
        assert_eq!(out, "&lt;script&gt;");
    }

    #[test]
    fn test_matched_extension() {
        let allowed = [".tmpl", ".html", ".en.html"];
        assert_eq!(matched_extension("index.tmpl", &allowed), Some(".tmpl"));
        assert_eq!(matched_extension("page.en.html", &allowed), Some(".en.html"));
        assert_eq!(matched_extension("page.fr.html", &allowed), None);
        assert_eq!(matched_extension("INDEX.TMPL", &allowed), None);
        assert_eq!(matched_extension("README", &allowed), None);
    }

    proptest! {
        #[test]
        fn test_template_name_joins_components(
            parts in prop::collection::vec("[a-z][a-z0-9_]{0,8}", 1..5),
        ) {
            let mut path = PathBuf::new();
            for part in &parts[..parts.len() - 1] {
                path.push(part);
            }
            path.push(format!("{}.tmpl", parts[parts.len() - 1]));

            prop_assert_eq!(template_name(&path, ".tmpl"), parts.join("/"));
        }
    }
}
