//! Components that MDX bodies may reference, e.g. `<Callout type="tip">`

use indexmap::IndexMap;
use std::collections::HashMap;

use super::mdx::CompileError;
use crate::config::ComponentConfig;
use crate::helpers::html_escape;

/// Props passed to a component, in source order
pub type Props = IndexMap<String, String>;

/// A component renders its opening and closing markup around its children.
pub trait Component: Send + Sync {
    /// Markup emitted for the opening tag
    fn open(&self, name: &str, props: &Props) -> Result<String, CompileError>;

    /// Markup emitted for the closing tag
    fn close(&self, props: &Props) -> String;

    /// Markup emitted for a self-closing tag
    fn render_empty(&self, name: &str, props: &Props) -> Result<String, CompileError> {
        Ok(format!("{}{}", self.open(name, props)?, self.close(props)))
    }
}

fn required<'a>(component: &str, props: &'a Props, prop: &'static str) -> Result<&'a str, CompileError> {
    props
        .get(prop)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CompileError::MissingProp {
            component: component.to_string(),
            prop,
        })
}

/// `<Callout type="tip" title="...">` highlighted aside
pub struct Callout;

impl Component for Callout {
    fn open(&self, _name: &str, props: &Props) -> Result<String, CompileError> {
        let kind = props.get("type").map(String::as_str).unwrap_or("note");
        let mut html = format!(
            r#"<aside class="callout callout-{}">"#,
            html_escape(&slug::slugify(kind))
        );
        if let Some(title) = props.get("title") {
            html.push_str(&format!(
                r#"<p class="callout-title">{}</p>"#,
                html_escape(title)
            ));
        }
        Ok(html)
    }

    fn close(&self, _props: &Props) -> String {
        "</aside>".to_string()
    }
}

/// `<YouTube id="..." />` embedded video
pub struct YouTube;

impl Component for YouTube {
    fn open(&self, name: &str, props: &Props) -> Result<String, CompileError> {
        let id = required(name, props, "id")?;
        let title = props.get("title").map(String::as_str).unwrap_or("YouTube video");
        Ok(format!(
            r#"<div class="video"><iframe src="https://www.youtube-nocookie.com/embed/{}" title="{}" loading="lazy" allowfullscreen></iframe>"#,
            crate::helpers::encode_url(id),
            html_escape(title)
        ))
    }

    fn close(&self, _props: &Props) -> String {
        "</div>".to_string()
    }
}

/// `<Figure src="..." alt="..." caption="..." />` image with caption
pub struct Figure;

impl Component for Figure {
    fn open(&self, name: &str, props: &Props) -> Result<String, CompileError> {
        let src = required(name, props, "src")?;
        let alt = props.get("alt").map(String::as_str).unwrap_or("");
        Ok(format!(
            r#"<figure><img src="{}" alt="{}" loading="lazy">"#,
            html_escape(src),
            html_escape(alt)
        ))
    }

    fn close(&self, props: &Props) -> String {
        match props.get("caption") {
            Some(caption) => format!("<figcaption>{}</figcaption></figure>", html_escape(caption)),
            None => "</figure>".to_string(),
        }
    }
}

/// A component declared in `_config.yml`: wraps children in `tag` with `class`
pub struct HtmlComponent {
    tag: String,
    class: String,
}

impl HtmlComponent {
    pub fn new(config: &ComponentConfig) -> Self {
        let tag: String = config
            .tag
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        Self {
            tag: if tag.is_empty() { "div".to_string() } else { tag },
            class: config.class.clone(),
        }
    }
}

impl Component for HtmlComponent {
    fn open(&self, _name: &str, props: &Props) -> Result<String, CompileError> {
        let mut classes = self.class.clone();
        if let Some(extra) = props.get("class").or_else(|| props.get("className")) {
            if !classes.is_empty() {
                classes.push(' ');
            }
            classes.push_str(extra);
        }
        if classes.is_empty() {
            Ok(format!("<{}>", self.tag))
        } else {
            Ok(format!(r#"<{} class="{}">"#, self.tag, html_escape(&classes)))
        }
    }

    fn close(&self, _props: &Props) -> String {
        format!("</{}>", self.tag)
    }
}

/// Name to component lookup used by the compiler
pub struct ComponentRegistry {
    components: HashMap<String, Box<dyn Component>>,
}

impl ComponentRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            components: HashMap::new(),
        }
    }

    /// Registry with the built-in components
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("Callout", Callout);
        registry.register("YouTube", YouTube);
        registry.register("Figure", Figure);
        registry
    }

    /// Built-ins plus components declared in the site config
    pub fn from_config(components: &IndexMap<String, ComponentConfig>) -> Self {
        let mut registry = Self::with_builtins();
        for (name, config) in components {
            tracing::debug!("Registering component <{}> as <{}>", name, config.tag);
            registry.register(name, HtmlComponent::new(config));
        }
        registry
    }

    pub fn register<C: Component + 'static>(&mut self, name: &str, component: C) {
        self.components.insert(name.to_string(), Box::new(component));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Component> {
        self.components.get(name).map(|c| c.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
