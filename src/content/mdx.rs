//! MDX compilation: Markdown with embedded components, rendered to HTML

use lazy_static::lazy_static;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::collections::HashMap;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use super::components::{ComponentRegistry, Props};
use crate::config::SiteConfig;
use crate::helpers::html_escape;

lazy_static! {
    /// `<Name props>`, `</Name>` or `<Name props />`, component names start uppercase
    static ref COMPONENT_TAG: Regex =
        Regex::new(r"<(/)?([A-Z][A-Za-z0-9_.]*)((?:\s[^<>]*?)?)\s*(/)?>").unwrap();
    static ref PROP: Regex =
        Regex::new(r#"([A-Za-z_][A-Za-z0-9_-]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|\{([^}]*)\}))?"#)
            .unwrap();
}

/// Errors raised while compiling a post body. These are not recovered from.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("unknown component <{0}>")]
    UnknownComponent(String),

    #[error("component <{component}> requires prop '{prop}'")]
    MissingProp {
        component: String,
        prop: &'static str,
    },

    #[error("closing tag </{0}> has no matching opening tag")]
    UnexpectedClose(String),

    #[error("expected </{expected}> but found </{found}>")]
    MismatchedClose { expected: String, found: String },

    #[error("component <{0}> is never closed")]
    Unclosed(String),
}

struct OpenComponent {
    name: String,
    props: Props,
}

/// Compiles MDX bodies to HTML with syntax highlighting and components
pub struct MdxCompiler {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
    line_numbers: bool,
    registry: ComponentRegistry,
}

impl MdxCompiler {
    /// Create a compiler with the built-in components
    pub fn new() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: "base16-ocean.dark".to_string(),
            line_numbers: false,
            registry: ComponentRegistry::with_builtins(),
        }
    }

    /// Create a compiler using the site's highlight settings and components
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            theme_name: config.highlight.theme.clone(),
            line_numbers: config.highlight.line_number,
            registry: ComponentRegistry::from_config(&config.components),
            ..Self::new()
        }
    }

    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    /// Compile an MDX body to HTML
    pub fn compile(&self, body: &str) -> Result<String, CompileError> {
        let source = strip_esm(body);

        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_SMART_PUNCTUATION
            | Options::ENABLE_HEADING_ATTRIBUTES
            | Options::ENABLE_GFM;
        let parser = Parser::new_ext(&source, options);

        let mut events: Vec<Event> = Vec::new();
        let mut stack: Vec<OpenComponent> = Vec::new();
        let mut in_code_block = false;
        let mut code_block_lang: Option<String> = None;
        let mut code_block_content = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    code_block_lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(|lang| lang.to_string()),
                        CodeBlockKind::Indented => None,
                    };
                    code_block_content.clear();
                }
                Event::End(TagEnd::CodeBlock) => {
                    let highlighted =
                        self.highlight_code(&code_block_content, code_block_lang.as_deref());
                    events.push(Event::Html(CowStr::from(highlighted)));
                    in_code_block = false;
                    code_block_lang = None;
                }
                Event::Text(text) if in_code_block => {
                    code_block_content.push_str(&text);
                }
                Event::Html(raw) => {
                    let expanded = self.expand_components(&raw, &mut stack)?;
                    events.push(Event::Html(CowStr::from(expanded)));
                }
                Event::InlineHtml(raw) => {
                    let expanded = self.expand_components(&raw, &mut stack)?;
                    events.push(Event::InlineHtml(CowStr::from(expanded)));
                }
                other => events.push(other),
            }
        }

        if let Some(open) = stack.pop() {
            return Err(CompileError::Unclosed(open.name));
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, assign_heading_ids(events).into_iter());

        Ok(html_output)
    }

    /// Replace component tags inside a raw HTML fragment
    fn expand_components(
        &self,
        raw: &str,
        stack: &mut Vec<OpenComponent>,
    ) -> Result<String, CompileError> {
        let mut out = String::with_capacity(raw.len());
        let mut last = 0;

        for caps in COMPONENT_TAG.captures_iter(raw) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&raw[last..whole.start()]);
            last = whole.end();

            let name = &caps[2];
            let component = self
                .registry
                .get(name)
                .ok_or_else(|| CompileError::UnknownComponent(name.to_string()))?;

            if caps.get(1).is_some() {
                let open = stack
                    .pop()
                    .ok_or_else(|| CompileError::UnexpectedClose(name.to_string()))?;
                if open.name != name {
                    return Err(CompileError::MismatchedClose {
                        expected: open.name,
                        found: name.to_string(),
                    });
                }
                out.push_str(&component.close(&open.props));
            } else {
                let props = parse_props(caps.get(3).map_or("", |m| m.as_str()));
                if caps.get(4).is_some() {
                    out.push_str(&component.render_empty(name, &props)?);
                } else {
                    out.push_str(&component.open(name, &props)?);
                    stack.push(OpenComponent {
                        name: name.to_string(),
                        props,
                    });
                }
            }
        }

        out.push_str(&raw[last..]);
        Ok(out)
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let lang = lang.unwrap_or("text");

        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let theme = self
            .theme_set
            .themes
            .get(&self.theme_name)
            .or_else(|| self.theme_set.themes.values().next());

        let highlighted = theme.and_then(|theme| {
            highlighted_html_for_string(code, &self.syntax_set, syntax, theme).ok()
        });

        match highlighted {
            Some(highlighted) if self.line_numbers => self.add_line_numbers(&highlighted, lang),
            Some(highlighted) => format!(
                r#"<figure class="highlight {}">{}</figure>"#,
                html_escape(lang),
                highlighted
            ),
            None => format!(
                r#"<pre><code class="language-{}">{}</code></pre>"#,
                html_escape(lang),
                html_escape(code)
            ),
        }
    }

    /// Add line numbers to highlighted code
    fn add_line_numbers(&self, code: &str, lang: &str) -> String {
        let lines: Vec<&str> = code.lines().collect();

        let gutter = (1..=lines.len())
            .map(|n| format!(r#"<span class="line-number">{}</span>"#, n))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"<figure class="highlight {}"><table><tr><td class="gutter"><pre>{}</pre></td><td class="code">{}</td></tr></table></figure>"#,
            html_escape(lang),
            gutter,
            lines.join("\n")
        )
    }
}

impl Default for MdxCompiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `key="value" key='value' key={expr} flag` into props
fn parse_props(raw: &str) -> Props {
    PROP.captures_iter(raw)
        .map(|caps| {
            let key = caps[1].to_string();
            let value = if let Some(v) = caps.get(2).or_else(|| caps.get(3)) {
                v.as_str().to_string()
            } else if let Some(expr) = caps.get(4) {
                let expr = expr.as_str().trim();
                expr.strip_prefix('"')
                    .and_then(|e| e.strip_suffix('"'))
                    .or_else(|| expr.strip_prefix('\'').and_then(|e| e.strip_suffix('\'')))
                    .unwrap_or(expr)
                    .to_string()
            } else {
                "true".to_string()
            };
            (key, value)
        })
        .collect()
}

/// Drop top-level `import`/`export` lines; fenced code is left alone
fn strip_esm(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut fence: Option<&str> = None;

    for line in body.split_inclusive('\n') {
        let trimmed = line.trim_start();
        match fence {
            Some(marker) => {
                if trimmed.starts_with(marker) {
                    fence = None;
                }
            }
            None if trimmed.starts_with("```") => fence = Some("```"),
            None if trimmed.starts_with("~~~") => fence = Some("~~~"),
            None if line.starts_with("import ") || line.starts_with("export ") => continue,
            None => {}
        }
        out.push_str(line);
    }

    out
}

/// Give every heading without an explicit `{#id}` a unique slug id
fn assign_heading_ids(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut out = Vec::with_capacity(events.len());
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut pending: Option<(usize, String)> = None;

    for event in events {
        if matches!(event, Event::Start(Tag::Heading { id: None, .. })) {
            pending = Some((out.len(), String::new()));
        } else if let (Some((_, text)), Event::Text(t) | Event::Code(t)) = (pending.as_mut(), &event)
        {
            text.push_str(t);
        } else if matches!(event, Event::End(TagEnd::Heading(_))) {
            if let Some((index, text)) = pending.take() {
                let id = unique_id(&mut seen, &text);
                if let Some(Event::Start(Tag::Heading { id: heading_id, .. })) = out.get_mut(index) {
                    *heading_id = Some(CowStr::from(id));
                }
            }
        }
        out.push(event);
    }

    out
}

fn unique_id(seen: &mut HashMap<String, usize>, text: &str) -> String {
    let mut base = slug::slugify(text);
    if base.is_empty() {
        base = "section".to_string();
    }
    let count = seen.entry(base.clone()).or_insert(0);
    let id = if *count == 0 {
        base
    } else {
        format!("{}-{}", base, count)
    };
    *count += 1;
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ComponentConfig;

    #[test]
    fn test_render_basic_markdown() {
        let compiler = MdxCompiler::new();
        let html = compiler.compile("Shrimp **every** day.\n\n- hips\n- frames\n").unwrap();
        assert!(html.contains("<p>Shrimp <strong>every</strong> day.</p>"));
        assert!(html.contains("<li>hips</li>"));
    }

    #[test]
    fn test_render_code_block() {
        let compiler = MdxCompiler::new();
        let html = compiler.compile("```rust\nfn main() {}\n```").unwrap();
        assert!(html.contains(r#"<figure class="highlight rust">"#));
        assert!(!html.contains("```"));
    }

    #[test]
    fn test_heading_ids_are_unique() {
        let compiler = MdxCompiler::new();
        let html = compiler
            .compile("# Closed Guard\n\n## Closed Guard\n\n## Custom {#mine}\n")
            .unwrap();
        assert!(html.contains(r#"<h1 id="closed-guard">Closed Guard</h1>"#));
        assert!(html.contains(r#"<h2 id="closed-guard-1">Closed Guard</h2>"#));
        assert!(html.contains(r#"<h2 id="mine">Custom</h2>"#));
    }

    #[test]
    fn test_esm_lines_are_dropped() {
        let compiler = MdxCompiler::new();
        let body = "import { Chart } from './chart'\nexport const meta = {}\n\nHello\n\n```js\nimport x from 'y'\n```\n";
        let html = compiler.compile(body).unwrap();
        assert!(!html.contains("./chart"));
        assert!(!html.contains("meta"));
        assert!(html.contains("<p>Hello</p>"));
        assert!(html.contains("import"));
    }

    #[test]
    fn test_block_component_wraps_markdown() {
        let compiler = MdxCompiler::new();
        let body = "<Callout type=\"tip\">\n\nKeep your **elbows** in.\n\n</Callout>\n";
        let html = compiler.compile(body).unwrap();
        assert!(html.contains(r#"<aside class="callout callout-tip">"#));
        assert!(html.contains("<strong>elbows</strong>"));
        assert!(html.contains("</aside>"));
        assert!(!html.contains("Callout"));
    }

    #[test]
    fn test_self_closing_component() {
        let compiler = MdxCompiler::new();
        let html = compiler.compile("<YouTube id='abc123' />\n").unwrap();
        assert!(html.contains("youtube-nocookie.com/embed/abc123"));
    }

    #[test]
    fn test_inline_configured_component() {
        let mut config = SiteConfig::default();
        config.components.insert(
            "Kbd".to_string(),
            ComponentConfig {
                tag: "kbd".to_string(),
                class: String::new(),
            },
        );
        let compiler = MdxCompiler::from_config(&config);
        let html = compiler.compile("Press <Kbd>Enter</Kbd> to save.").unwrap();
        assert!(html.contains("<p>Press <kbd>Enter</kbd> to save.</p>"));
    }

    #[test]
    fn test_plain_html_passes_through() {
        let compiler = MdxCompiler::new();
        let html = compiler.compile("<div class=\"note\">\nhi\n</div>\n").unwrap();
        assert!(html.contains("<div class=\"note\">"));
    }

    #[test]
    fn test_unknown_component_is_an_error() {
        let compiler = MdxCompiler::new();
        let err = compiler.compile("<Chart data={points} />\n").unwrap_err();
        assert!(matches!(err, CompileError::UnknownComponent(name) if name == "Chart"));
    }

    #[test]
    fn test_unbalanced_components_are_errors() {
        let compiler = MdxCompiler::new();

        let err = compiler.compile("<Callout>\n\ntext\n").unwrap_err();
        assert!(matches!(err, CompileError::Unclosed(name) if name == "Callout"));

        let err = compiler.compile("text\n\n</Callout>\n").unwrap_err();
        assert!(matches!(err, CompileError::UnexpectedClose(_)));

        let err = compiler
            .compile("<Callout>\n\n<Figure src=\"a.png\">\n\n</Callout>\n")
            .unwrap_err();
        assert!(matches!(err, CompileError::MismatchedClose { .. }));
    }

    #[test]
    fn test_parse_props() {
        let props = parse_props(r#" type="tip" title='Hi there' count={3} label={"x"} open"#);
        assert_eq!(props["type"], "tip");
        assert_eq!(props["title"], "Hi there");
        assert_eq!(props["count"], "3");
        assert_eq!(props["label"], "x");
        assert_eq!(props["open"], "true");
    }
}
