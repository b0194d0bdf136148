//! Template engine
//!
//! Renders HTML pages with Tera. Features:
//! - templates embedded in the binary from `templates/`
//! - an optional directory whose `.html` files replace embedded ones by name
//! - standard page variables (current user, year)
//! - a plain HTML error page when even the error template fails

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fs;
use std::path::Path;

use chrono::Datelike;
use rust_embed::RustEmbed;
use serde::Serialize;
use tera::{Context as TeraContext, Tera};

use crate::models::User;

mod error;
mod filters;

pub use error::TemplateError;
pub use filters::{format_ru_date, EMPTY_VALUE_DISPLAY};

/// Site name shown in page titles and the header
pub const SITE_NAME: &str = "Блогикум";

#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct EmbeddedTemplates;

/// Template engine for rendering pages
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Build the engine from the embedded templates, then apply overrides
    /// from `override_dir` if given.
    pub fn new(override_dir: Option<&Path>) -> Result<Self, TemplateError> {
        let mut templates = embedded_templates()?;

        if let Some(dir) = override_dir {
            let before = templates.len();
            collect_templates_from_dir(dir, dir, &mut templates)?;
            tracing::info!(
                path = %dir.display(),
                added = templates.len() - before,
                "Template overrides loaded"
            );
        }

        let mut tera = Tera::default();
        filters::register(&mut tera);

        // add_raw_templates builds inheritance chains once all parents are known
        tera.add_raw_templates(templates.iter().map(|(name, content)| (name.as_str(), content.as_str())))
            .map_err(|e| TemplateError::Load(error_chain(&e)))?;

        Ok(Self { tera })
    }

    /// Render a template with context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String, TemplateError> {
        self.tera.render(template, context).map_err(|e| {
            TemplateError::Render(format!("Failed to render '{}': {}", template, error_chain(&e)))
        })
    }

    /// Render, falling back to a bare HTML page if the template fails.
    ///
    /// Used for error pages, where a second failure must not bubble up.
    pub fn render_with_fallback(&self, template: &str, context: &TeraContext) -> String {
        match self.render(template, context) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("{}", e);
                simple_error_page(template, &e.to_string())
            }
        }
    }

    /// Check whether a template with the given name is loaded
    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }
}

/// Variables every page receives
#[derive(Debug, Clone, Serialize)]
pub struct StandardTemplateVars {
    pub site_name: &'static str,
    /// Authenticated user, if any
    pub user: Option<User>,
    /// Current request path
    pub request_path: String,
    /// Current year (footer)
    pub year: i32,
}

impl StandardTemplateVars {
    pub fn new(user: Option<User>, request_path: impl Into<String>) -> Self {
        Self {
            site_name: SITE_NAME,
            user,
            request_path: request_path.into(),
            year: chrono::Utc::now().year(),
        }
    }

    /// A context pre-filled with the standard variables
    pub fn into_context(self) -> TeraContext {
        let mut ctx = TeraContext::new();
        ctx.insert("site_name", self.site_name);
        ctx.insert("user", &self.user);
        ctx.insert("request_path", &self.request_path);
        ctx.insert("year", &self.year);
        ctx.insert("empty_value", EMPTY_VALUE_DISPLAY);
        ctx
    }
}

fn embedded_templates() -> Result<BTreeMap<String, String>, TemplateError> {
    let mut templates = BTreeMap::new();
    for name in EmbeddedTemplates::iter() {
        let file = EmbeddedTemplates::get(&name)
            .ok_or_else(|| TemplateError::Load(format!("Embedded template vanished: {}", name)))?;
        let content = String::from_utf8(file.data.into_owned())
            .map_err(|_| TemplateError::Load(format!("Template is not UTF-8: {}", name)))?;
        templates.insert(name.replace('\\', "/"), content);
    }
    Ok(templates)
}

/// Collect `.html` files below `current_path`, named relative to `base_path`
fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut BTreeMap<String, String>,
) -> Result<(), TemplateError> {
    if !current_path.exists() {
        tracing::warn!(path = %current_path.display(), "Template override directory does not exist");
        return Ok(());
    }

    for entry in fs::read_dir(current_path)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().is_some_and(|ext| ext == "html") {
            let relative = path
                .strip_prefix(base_path)
                .map_err(|_| TemplateError::Load(format!("Bad template path: {:?}", path)))?;
            let name = relative.to_string_lossy().replace('\\', "/");
            let content = fs::read_to_string(&path)?;
            templates.insert(name, content);
        }
    }

    Ok(())
}

fn error_chain(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

/// Last-resort page when the template engine itself fails
fn simple_error_page(template: &str, error: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="ru">
<head>
    <meta charset="UTF-8">
    <title>Ошибка шаблона</title>
    <style>
        body {{ font-family: sans-serif; max-width: 600px; margin: 50px auto; }}
        .error-box {{ border-left: 4px solid #e74c3c; padding: 20px; }}
    </style>
</head>
<body>
    <div class="error-box">
        <h1>Ошибка шаблона</h1>
        <p>Не удалось отрисовать шаблон <code>{}</code></p>
        <pre>{}</pre>
    </div>
</body>
</html>"#,
        tera::escape_html(template),
        tera::escape_html(error)
    )
}
