//! Handlebars rendering for report documents.
//!
//! Custom helpers:
//! - paragraphs: split text on blank lines into escaped `<p>` blocks
//! - default: fall back to a literal when a value is missing

use handlebars::{
    html_escape, Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext,
};
use serde_json::Value;

use crate::templates::TemplatesFile;
use crate::RenderError;

pub struct TemplateRenderer<'a> {
    handlebars: Handlebars<'a>,
    templates: TemplatesFile,
}

impl<'a> TemplateRenderer<'a> {
    pub fn new(templates: TemplatesFile) -> Result<Self, RenderError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);

        handlebars.register_helper("paragraphs", Box::new(ParagraphsHelper));
        handlebars.register_helper("default", Box::new(DefaultHelper));

        for (name, template) in &templates.templates {
            handlebars
                .register_template_string(name, &template.template)
                .map_err(|e| RenderError::Template(format!("template '{name}': {e}")))?;
        }

        Ok(TemplateRenderer {
            handlebars,
            templates,
        })
    }

    pub fn render(&self, template_name: &str, data: &Value) -> Result<String, RenderError> {
        self.handlebars
            .render(template_name, data)
            .map_err(|e| RenderError::Render(e.to_string()))
    }

    pub fn list_templates(&self) -> Vec<&str> {
        self.templates.list_templates()
    }
}

/// Escaped `<p>` blocks; single newlines inside a block become `<br>`.
pub fn paragraphs_html(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| {
            let lines: Vec<String> = block.lines().map(|l| html_escape(l.trim())).collect();
            format!("<p>{}</p>", lines.join("<br>"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

struct ParagraphsHelper;

impl HelperDef for ParagraphsHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let text = h.param(0).and_then(|v| v.value().as_str()).unwrap_or("");
        out.write(&paragraphs_html(text))?;
        Ok(())
    }
}

struct DefaultHelper;

impl HelperDef for DefaultHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let value = h.param(0).map(|v| v.value());
        let default = h.param(1).and_then(|v| v.value().as_str()).unwrap_or("");

        match value {
            Some(Value::String(s)) if !s.is_empty() => out.write(&html_escape(s))?,
            Some(v) if !v.is_null() && !v.is_string() => out.write(&v.to_string())?,
            _ => out.write(&html_escape(default))?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn renderer() -> TemplateRenderer<'static> {
        let templates = TemplatesFile::from_yaml(
            r#"
version: "1.0"
templates:
  report:
    template: "{{{paragraphs text}}}"
  byline:
    template: "By {{default author \"Newsdesk\"}}"
"#,
        )
        .unwrap();
        TemplateRenderer::new(templates).unwrap()
    }

    #[test]
    fn test_paragraphs_split_and_escape() {
        let html = paragraphs_html("Stocks <up>\nBonds flat\n\n\nGold & silver");
        assert_eq!(html, "<p>Stocks &lt;up&gt;<br>Bonds flat</p>\n<p>Gold &amp; silver</p>");
    }

    #[test]
    fn test_paragraphs_helper() {
        let out = renderer().render("report", &json!({ "text": "a\n\nb" })).unwrap();
        assert_eq!(out, "<p>a</p>\n<p>b</p>");
    }

    #[test]
    fn test_default_helper() {
        let r = renderer();
        assert_eq!(r.render("byline", &json!({})).unwrap(), "By Newsdesk");
        assert_eq!(
            r.render("byline", &json!({ "author": "Desk A" })).unwrap(),
            "By Desk A"
        );
    }

    #[test]
    fn test_broken_template_rejected() {
        let templates = TemplatesFile::from_yaml(
            "version: \"1\"\ntemplates:\n  report:\n    template: \"{{#if x}}\"\n",
        )
        .unwrap();
        assert!(matches!(
            TemplateRenderer::new(templates),
            Err(RenderError::Template(_))
        ));
    }
}
