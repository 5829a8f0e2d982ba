// src/core/template.rs

//! Loading and rendering of the project's file templates.
//!
//! Templates live in `<root>/jarvis_files/templates` and are written in
//! Jinja2 syntax: `{{ board.port }}`, `{% if %}`, `{% for %}`, filters, and
//! `{% include %}` of other templates from the same directory. Undefined
//! values render as nothing.

use minijinja::{Environment, ErrorKind};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Errors from loading or rendering a template.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// No template with this name exists under the loader's root.
    #[error("Template '{name}' not found.")]
    NotFound { name: String },
    /// The template could not be parsed or evaluated.
    #[error("Failed to render template '{name}': {message}")]
    Render { name: String, message: String },
    /// Reading a template or writing its output failed.
    #[error("Could not access '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Loads templates by name from a single directory.
#[derive(Debug, Clone)]
pub struct TemplateLoader {
    root: PathBuf,
    env: Environment<'static>,
}

impl TemplateLoader {
    /// Creates a loader for `root`. The directory is not touched until a
    /// template is requested.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let mut env = Environment::new();
        let loader_root = root.clone();
        env.set_loader(move |name| read_source(&loader_root, name));
        Self { root, env }
    }

    /// The directory templates are loaded from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loads and parses the template `name`, a path relative to the loader's root.
    ///
    /// Names that would leave the root (absolute paths, `..`) are treated as
    /// missing.
    pub fn get_template(&self, name: &str) -> Result<Template<'_>, TemplateError> {
        log::debug!("Loading template '{}' from '{}'", name, self.root.display());
        match self.env.get_template(name) {
            Ok(inner) => Ok(Template {
                name: name.to_string(),
                inner,
            }),
            Err(e) if e.kind() == ErrorKind::TemplateNotFound => {
                Err(TemplateError::NotFound {
                    name: name.to_string(),
                })
            }
            Err(e) => Err(render_error(name, &e)),
        }
    }
}

/// Reads a template's source for the engine. `Ok(None)` means "not found".
fn read_source(root: &Path, name: &str) -> Result<Option<String>, minijinja::Error> {
    let relative = Path::new(name);
    let stays_inside = !name.is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !stays_inside {
        return Ok(None);
    }

    let path = root.join(relative);
    if !path.is_file() {
        return Ok(None);
    }
    fs::read_to_string(&path).map(Some).map_err(|e| {
        minijinja::Error::new(
            ErrorKind::InvalidOperation,
            format!("could not read '{}'", path.display()),
        )
        .with_source(e)
    })
}

fn render_error(name: &str, error: &minijinja::Error) -> TemplateError {
    TemplateError::Render {
        name: name.to_string(),
        message: error.to_string(),
    }
}

/// A loaded template, ready to render.
#[derive(Debug)]
pub struct Template<'env> {
    name: String,
    inner: minijinja::Template<'env, 'env>,
}

impl Template<'_> {
    /// The name the template was loaded under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders the template against `variables`.
    pub fn render(&self, variables: &Map<String, Value>) -> Result<String, TemplateError> {
        self.inner
            .render(variables)
            .map_err(|e| render_error(&self.name, &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::{TempDir, tempdir};

    fn vars(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn loader_with(files: &[(&str, &str)]) -> (TempDir, TemplateLoader) {
        let dir = tempdir().unwrap();
        for (name, source) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, source).unwrap();
        }
        let loader = TemplateLoader::new(dir.path());
        (dir, loader)
    }

    fn render(
        loader: &TemplateLoader,
        name: &str,
        variables: Value,
    ) -> Result<String, TemplateError> {
        loader.get_template(name)?.render(&vars(variables))
    }

    #[test]
    fn test_render_substitutes_nested_values() {
        let (_dir, loader) = loader_with(&[(
            "launch.xml",
            "<node name=\"{{ name }}\" port=\"{{board.port}}\" first=\"{{ ids[0] }}\"/>",
        )]);

        let rendered = render(
            &loader,
            "launch.xml",
            json!({ "name": "rover", "board": { "port": 9090 }, "ids": ["a", "b"] }),
        )
        .unwrap();

        assert_eq!(rendered, "<node name=\"rover\" port=\"9090\" first=\"a\"/>");
    }

    #[test]
    fn test_render_for_loop() {
        let (_dir, loader) = loader_with(&[(
            "deps.txt",
            "{% for dep in deps %}{{ loop.index }}={{ dep }};{% endfor %}",
        )]);

        let rendered = render(&loader, "deps.txt", json!({ "deps": ["rospy", "numpy"] })).unwrap();

        assert_eq!(rendered, "1=rospy;2=numpy;");
    }

    #[test]
    fn test_render_if_branch_and_filters() {
        let (_dir, loader) = loader_with(&[(
            "mode.txt",
            "{% if sim %}simulated{% else %}real{% endif %} {{ name | upper }}",
        )]);

        let sim = render(&loader, "mode.txt", json!({ "sim": true, "name": "nav" })).unwrap();
        let real = render(&loader, "mode.txt", json!({ "sim": false, "name": "nav" })).unwrap();

        assert_eq!(sim, "simulated NAV");
        assert_eq!(real, "real NAV");
    }

    #[test]
    fn test_render_undefined_is_empty_and_comments_dropped() {
        let (_dir, loader) = loader_with(&[("t", "[{{ missing }}]a{# not shown #}b")]);

        assert_eq!(render(&loader, "t", json!({})).unwrap(), "[]ab");
    }

    #[test]
    fn test_include_resolves_through_loader() {
        let (_dir, loader) = loader_with(&[
            ("parts/header.txt", "# {{ title }}"),
            ("page.txt", "{% include \"parts/header.txt\" %}\nbody"),
        ]);

        let rendered = render(&loader, "page.txt", json!({ "title": "Rover" })).unwrap();

        assert_eq!(rendered, "# Rover\nbody");
    }

    #[test]
    fn test_syntax_error_is_render_error() {
        let (_dir, loader) = loader_with(&[("broken.txt", "ok\n{% for x in xs %}{{ x }}")]);

        let err = render(&loader, "broken.txt", json!({ "xs": [1] })).unwrap_err();

        match err {
            TemplateError::Render { name, .. } => assert_eq!(name, "broken.txt"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_loader_reads_templates_by_name() {
        let (_dir, loader) = loader_with(&[("ros/env.sh", "export ROOT={{ root }}\n")]);

        let tpl = loader.get_template("ros/env.sh").unwrap();

        assert_eq!(tpl.name(), "ros/env.sh");
        // A single trailing newline is dropped, as Jinja2 does by default.
        let rendered = tpl.render(&vars(json!({ "root": "/proj" }))).unwrap();
        assert_eq!(rendered, "export ROOT=/proj");
    }

    #[test]
    fn test_loader_missing_and_escaping_names_are_not_found() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        let loader = TemplateLoader::new(dir.path().join("sub"));
        fs::write(dir.path().join("secret"), "x").unwrap();

        for name in ["missing.txt", "../secret", "/etc/hostname", ""] {
            let result = loader.get_template(name);
            assert!(
                matches!(result, Err(TemplateError::NotFound { .. })),
                "expected NotFound for {:?}",
                name
            );
        }
    }

    #[test]
    fn test_include_cannot_escape_root() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("secret"), "x").unwrap();
        fs::write(dir.path().join("sub/page.txt"), "{% include \"../secret\" %}").unwrap();
        let loader = TemplateLoader::new(dir.path().join("sub"));

        let result = render(&loader, "page.txt", json!({}));

        assert!(matches!(result, Err(TemplateError::Render { .. })));
    }
}
