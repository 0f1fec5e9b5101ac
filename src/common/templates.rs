//! Templates module for embedded TOML templates
//! Template files are embedded at compile time using include_str! macro

use std::collections::HashMap;

/// Get the starter manifest written by `dm init`
pub fn get_manifest_template() -> &'static str {
    include_str!("../../templates/manifest.toml")
}

/// Get the pyproject.toml written into a freshly scaffolded project
pub fn get_project_pyproject_template() -> &'static str {
    include_str!("../../templates/project_pyproject.toml")
}

/// Template replacement functionality
pub struct TemplateProcessor;

impl TemplateProcessor {
    /// Create a new template processor
    pub fn new() -> Self {
        Self
    }

    /// Replace every `{{key}}` placeholder with its value.
    /// Unknown placeholders are left untouched.
    pub fn process(&self, template: &str, replacements: Option<&HashMap<String, String>>) -> String {
        let mut rendered = template.to_string();
        if let Some(replacements) = replacements {
            for (key, value) in replacements {
                rendered = rendered.replace(&format!("{{{{{}}}}}", key), value);
            }
        }
        rendered
    }

    /// Get the starter manifest with optional processing
    pub fn get_default_manifest(&self) -> String {
        self.process(get_manifest_template(), None)
    }

    /// Render the project pyproject.toml for `project_name`
    pub fn render_project_pyproject(&self, project_name: &str, settings_module: &str) -> String {
        let mut replacements = HashMap::new();
        replacements.insert("project_name".to_string(), project_name.to_string());
        replacements.insert("settings_module".to_string(), settings_module.to_string());
        self.process(get_project_pyproject_template(), Some(&replacements))
    }
}

impl Default for TemplateProcessor {
    fn default() -> Self {
        Self::new()
    }
}
