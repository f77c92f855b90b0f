//! Template loading for report documents.
//!
//! Templates live in a YAML file:
//!
//! ```yaml
//! version: "1.0"
//! templates:
//!   report:
//!     description: Daily report page
//!     template: "<html dir=\"{{direction}}\">...</html>"
//! ```
//!
//! A built-in set is compiled into the crate and used when no file is given.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::RenderError;

/// Built-in templates
pub const DEFAULT_TEMPLATES: &str = include_str!("../templates/report.yaml");

/// Name of the template used for report documents
pub const REPORT_TEMPLATE: &str = "report";

#[derive(Debug, Clone, Deserialize)]
pub struct TemplatesFile {
    pub version: String,
    pub templates: HashMap<String, Template>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub description: String,
    pub template: String,
}

impl TemplatesFile {
    pub fn builtin() -> Result<Self, RenderError> {
        Self::from_yaml(DEFAULT_TEMPLATES)
    }

    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RenderError::Template(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, RenderError> {
        let file: TemplatesFile = serde_yaml::from_str(yaml)
            .map_err(|e| RenderError::Template(format!("invalid templates YAML: {e}")))?;
        if !file.templates.contains_key(REPORT_TEMPLATE) {
            return Err(RenderError::Template(format!(
                "templates file has no '{REPORT_TEMPLATE}' template"
            )));
        }
        Ok(file)
    }

    pub fn list_templates(&self) -> Vec<&str> {
        self.templates.keys().map(|s| s.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_templates_parse() {
        let file = TemplatesFile::builtin().unwrap();
        assert!(file.templates.contains_key(REPORT_TEMPLATE));
        assert_eq!(file.version, "1.0");
    }

    #[test]
    fn test_missing_report_template_rejected() {
        let yaml = r#"
version: "1.0"
templates:
  other:
    template: "{{text}}"
"#;
        let err = TemplatesFile::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("no 'report' template"));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.yaml");
        std::fs::write(
            &path,
            "version: \"2\"\ntemplates:\n  report:\n    template: \"{{title}}\"\n",
        )
        .unwrap();

        let file = TemplatesFile::load(&path).unwrap();
        assert_eq!(file.version, "2");
        assert_eq!(file.list_templates(), vec!["report"]);
    }
}
