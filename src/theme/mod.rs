//! Template engine
//!
//! Pages are rendered with Tera. The default templates are embedded in the
//! binary; a configured directory can override any of them by file name.
//! Features:
//! - Embedded templates with on-disk overrides
//! - Standard template variables
//! - Fallback to `error.html`, then to a built-in page

use chrono::Datelike;
use rust_embed::RustEmbed;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use tera::{Context as TeraContext, Tera};

use crate::models::UserModel;

mod error;

pub use error::ThemeError;

/// Templates compiled into the binary
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct EmbeddedTemplates;

/// Site name shown in page titles
pub const SITE_NAME: &str = "QP Gen";

/// Template engine for rendering pages
pub struct ThemeEngine {
    /// Tera template engine instance
    tera: Tera,
}

impl ThemeEngine {
    /// Create a template engine from the embedded templates, overridden by
    /// any `*.html` files in `override_dir`.
    pub fn new(override_dir: Option<&Path>) -> Result<Self, ThemeError> {
        let mut templates = embedded_templates();

        if let Some(dir) = override_dir {
            if dir.is_dir() {
                let overrides = load_override_templates(dir)?;
                tracing::info!(count = overrides.len(), path = %dir.display(), "Loaded template overrides");
                templates.extend(overrides);
            } else {
                tracing::warn!(path = %dir.display(), "Template override directory not found, using embedded templates");
            }
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .map_err(|e| ThemeError::TemplateError(error_chain(&e)))?;

        Ok(Self { tera })
    }

    /// Create a template engine from the embedded templates only
    pub fn embedded() -> Result<Self, ThemeError> {
        Self::new(None)
    }

    /// Check whether a template is registered
    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Render a template with the given context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String, ThemeError> {
        if !self.has_template(template) {
            return Err(ThemeError::NotFound(template.to_string()));
        }

        self.tera.render(template, context).map_err(|e| {
            ThemeError::TemplateError(format!("Failed to render '{}': {}", template, error_chain(&e)))
        })
    }

    /// Render a template with standard variables automatically added
    pub fn render_with_standard_vars(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
    ) -> Result<String, ThemeError> {
        let mut full_context = context.clone();
        standard_vars.apply(&mut full_context);
        self.render(template, &full_context)
    }

    /// Render a template, falling back to `error.html` and finally to a
    /// built-in page. Never fails.
    pub fn render_with_fallback(&self, template: &str, context: &TeraContext) -> String {
        match self.render(template, context) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(template, error = %e, "Failed to render template, trying error template");

                let mut error_context = context.clone();
                error_context.insert("error_message", &e.to_string());
                error_context.insert("requested_template", template);

                match self.render("error.html", &error_context) {
                    Ok(html) => html,
                    Err(error_template_err) => {
                        tracing::warn!(error = %error_template_err, "Failed to render error template");
                        Self::simple_error_page(template, &e.to_string())
                    }
                }
            }
        }
    }

    /// Last-resort HTML page when no template can be rendered
    pub fn simple_error_page(template: &str, error: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Something went wrong</title>
</head>
<body>
    <h1>Something went wrong</h1>
    <p>The page <code>{}</code> could not be rendered.</p>
    <pre>{}</pre>
    <p><a href="/">Back to home</a></p>
</body>
</html>"#,
            html_escape(template),
            html_escape(error)
        )
    }
}

/// Variables every page receives
#[derive(Debug, Clone)]
pub struct StandardTemplateVars {
    pub site_name: String,
    pub request_path: String,
    pub year: i32,
    /// Signed-in user attached by the session gate
    pub current_user: Option<UserModel>,
}

impl StandardTemplateVars {
    pub fn new(request_path: impl Into<String>, current_user: Option<UserModel>) -> Self {
        Self {
            site_name: SITE_NAME.to_string(),
            request_path: request_path.into(),
            year: chrono::Utc::now().year(),
            current_user,
        }
    }

    pub(crate) fn apply(&self, context: &mut TeraContext) {
        context.insert("site_name", &self.site_name);
        context.insert("request_path", &self.request_path);
        context.insert("year", &self.year);
        if let Some(ref user) = self.current_user {
            context.insert("current_user", user);
        }
    }
}

fn embedded_templates() -> BTreeMap<String, String> {
    EmbeddedTemplates::iter()
        .filter_map(|name| {
            let file = EmbeddedTemplates::get(&name)?;
            let body = String::from_utf8(file.data.into_owned()).ok()?;
            Some((name.into_owned(), body))
        })
        .collect()
}

fn load_override_templates(dir: &Path) -> Result<BTreeMap<String, String>, ThemeError> {
    let mut templates = BTreeMap::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("html") {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        templates.insert(name.to_string(), fs::read_to_string(&path)?);
    }

    Ok(templates)
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

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
