//! Site configuration (_config.yml)

use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Deployment mode. Drafts are only listed outside production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Production,
    Development,
}

impl Mode {
    pub fn is_production(self) -> bool {
        self == Mode::Production
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Production => f.write_str("production"),
            Mode::Development => f.write_str("development"),
        }
    }
}

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub tagline: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub author: String,
    pub language: String,

    // URL
    pub url: String,

    // Mode
    pub mode: Mode,

    // Directory
    pub content_dir: String,
    pub public_dir: String,
    pub static_dir: String,

    // Blog
    pub words_per_minute: usize,
    pub recent_posts: usize,
    /// Fail instead of skipping posts with malformed front-matter
    pub strict: bool,
    #[serde(default)]
    pub highlight: HighlightConfig,

    // Landing page
    #[serde(default)]
    pub features: Vec<FeatureItem>,
    #[serde(default)]
    pub faq: Vec<FaqItem>,

    /// Extra MDX components, keyed by component name
    #[serde(default)]
    pub components: IndexMap<String, ComponentConfig>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Avanco".to_string(),
            tagline: "Transform Your BJJ Training Notes Into Actionable Insights".to_string(),
            description: "AI-powered note enhancement that turns raw training observations into structured, searchable knowledge for Brazilian Jiu-Jitsu practitioners.".to_string(),
            keywords: Vec::new(),
            author: "Avanco".to_string(),
            language: "en".to_string(),

            url: "https://avanco.ai".to_string(),

            mode: Mode::Production,

            content_dir: "content/blog".to_string(),
            public_dir: "public".to_string(),
            static_dir: "static".to_string(),

            words_per_minute: 200,
            recent_posts: 3,
            strict: false,
            highlight: HighlightConfig::default(),

            features: Vec::new(),
            faq: Vec::new(),
            components: IndexMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

/// Code highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub theme: String,
    pub line_number: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: "base16-ocean.dark".to_string(),
            line_number: false,
        }
    }
}

/// A feature card shown on the landing page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureItem {
    pub title: String,
    pub description: String,
}

/// A question/answer pair shown on the landing page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
}

/// A user-declared MDX component that wraps its children in an element
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentConfig {
    pub tag: String,
    pub class: String,
}

impl Default for ComponentConfig {
    fn default() -> Self {
        Self {
            tag: "div".to_string(),
            class: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.title, "Avanco");
        assert_eq!(config.mode, Mode::Production);
        assert_eq!(config.content_dir, "content/blog");
        assert_eq!(config.words_per_minute, 200);
        assert_eq!(config.recent_posts, 3);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
url: https://example.com
mode: development
recent_posts: 5
features:
  - title: Smart Flashcards
    description: Review techniques with spaced repetition.
faq:
  - question: Is it free?
    answer: Yes.
components:
  Note:
    tag: aside
    class: note
  Grid: {}
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.mode, Mode::Development);
        assert_eq!(config.recent_posts, 5);
        assert_eq!(config.features[0].title, "Smart Flashcards");
        assert_eq!(config.faq.len(), 1);
        assert_eq!(config.faq[0].answer, "Yes.");
        let names: Vec<_> = config.components.keys().cloned().collect();
        assert_eq!(names, vec!["Note", "Grid"]);
        assert_eq!(config.components["Note"].tag, "aside");
        assert_eq!(config.components["Grid"].tag, "div");
        // Untouched keys keep their defaults
        assert_eq!(config.public_dir, "public");
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let result = serde_yaml::from_str::<SiteConfig>("mode: staging\n");
        assert!(result.is_err());
    }
}
