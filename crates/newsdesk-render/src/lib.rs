//! Newsdesk Render: translated summaries to printable HTML documents
//!
//! One document per language, written to `<output_root>/<run_id>/report_<code>.html`.
//! Right-to-left languages get `dir="rtl"` and right-aligned body text.

pub mod renderer;
pub mod templates;

use async_trait::async_trait;
use chrono::Utc;
use newsdesk_core::{DocumentRef, ProviderError, RenderRequest, Renderer};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

pub use renderer::{paragraphs_html, TemplateRenderer};
pub use templates::{TemplatesFile, REPORT_TEMPLATE};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("TEMPLATE/{0}")]
    Template(String),

    #[error("RENDER/{0}")]
    Render(String),

    #[error("IO/{0}")]
    Io(#[from] std::io::Error),
}

impl From<RenderError> for ProviderError {
    fn from(e: RenderError) -> Self {
        match e {
            RenderError::Io(io) => ProviderError::Io(io),
            other => ProviderError::Other(other.to_string()),
        }
    }
}

pub const HTML_MIME: &str = "text/html";

/// File-backed [`Renderer`] producing one HTML page per request.
pub struct HtmlRenderer {
    templates: TemplateRenderer<'static>,
    output_root: PathBuf,
}

impl HtmlRenderer {
    pub fn new(output_root: impl Into<PathBuf>) -> Result<Self, RenderError> {
        Self::with_templates(output_root, TemplatesFile::builtin()?)
    }

    pub fn with_templates(
        output_root: impl Into<PathBuf>,
        templates: TemplatesFile,
    ) -> Result<Self, RenderError> {
        Ok(Self {
            templates: TemplateRenderer::new(templates)?,
            output_root: output_root.into(),
        })
    }

    pub fn document_path(&self, request: &RenderRequest<'_>) -> PathBuf {
        self.output_root
            .join(request.run_id.to_string())
            .join(format!("report_{}.html", request.language.code))
    }

    pub fn render_html(&self, request: &RenderRequest<'_>) -> Result<String, RenderError> {
        let align = if request.direction.is_rtl() { "right" } else { "left" };
        let data = json!({
            "title": request.title,
            "text": request.text,
            "language": request.language,
            "direction": request.direction.as_str(),
            "align": align,
            "generated_at": Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
        });
        self.templates.render(REPORT_TEMPLATE, &data)
    }
}

#[async_trait]
impl Renderer for HtmlRenderer {
    async fn render(&self, request: RenderRequest<'_>) -> Result<DocumentRef, ProviderError> {
        let html = self.render_html(&request)?;
        let path = self.document_path(&request);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, html.as_bytes()).await?;

        debug!(
            language = %request.language.code,
            path = %path.display(),
            bytes = html.len(),
            "Rendered document"
        );

        Ok(DocumentRef {
            path,
            mime: HTML_MIME.to_string(),
            bytes: html.len() as u64,
        })
    }
}
