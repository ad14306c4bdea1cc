//! Generator module - renders pages with the built-in Tera templates and
//! writes the static site

mod sitemap;

pub use sitemap::{build_sitemap, render_sitemap, ChangeFrequency, SitemapEntry};

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;
use tera::Context;
use walkdir::WalkDir;

use crate::config::SiteConfig;
use crate::content::{MdxCompiler, Post};
use crate::templates::{BlogListing, PostData, SiteData, TemplateRenderer};
use crate::Site;

/// Renders every page of the site to an HTML string
pub struct SiteRenderer {
    config: SiteConfig,
    templates: TemplateRenderer,
    compiler: MdxCompiler,
}

impl SiteRenderer {
    pub fn new(config: &SiteConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            templates: TemplateRenderer::new()?,
            compiler: MdxCompiler::from_config(config),
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Create a base context with common variables
    fn base_context(&self, current_path: &str, now: DateTime<Utc>) -> Context {
        let mut context = Context::new();
        context.insert("site", &SiteData::new(&self.config, now));
        context.insert("current_path", current_path);
        context
    }

    /// Landing page with the most recent posts
    pub fn render_home(&self, posts: &[Post], now: DateTime<Utc>) -> Result<String> {
        let recent: Vec<PostData> = posts
            .iter()
            .take(self.config.recent_posts)
            .map(|p| PostData::new(p, &self.config))
            .collect();

        let mut context = self.base_context("/", now);
        context.insert("recent_posts", &recent);
        self.templates.render("index.html", &context)
    }

    /// Blog listing page
    pub fn render_blog(&self, posts: &[Post], now: DateTime<Utc>) -> Result<String> {
        let mut context = self.base_context("/blog", now);
        context.insert("listing", &BlogListing::new(posts, &self.config));
        self.templates.render("blog.html", &context)
    }

    /// Post detail page. Compile errors in the body are returned, not hidden.
    pub fn render_post(&self, post: &Post, now: DateTime<Utc>) -> Result<String> {
        let html = self
            .compiler
            .compile(&post.body)
            .with_context(|| format!("Failed to compile {:?}", post.full_source))?;

        let data = PostData::new(post, &self.config).with_content(html);
        let mut context = self.base_context(&data.path, now);
        context.insert("post", &data);
        self.templates.render("post.html", &context)
    }

    /// Not-found page
    pub fn render_not_found(&self, now: DateTime<Utc>) -> Result<String> {
        let context = self.base_context("/404.html", now);
        self.templates.render("404.html", &context)
    }

    /// sitemap.xml for the listed posts
    pub fn render_sitemap(&self, posts: &[Post], now: DateTime<Utc>) -> String {
        render_sitemap(&build_sitemap(&self.config, posts, now))
    }
}

/// Static site generator
pub struct Generator {
    site: Site,
    renderer: SiteRenderer,
}

impl Generator {
    /// Create a new generator
    pub fn new(site: &Site) -> Result<Self> {
        Ok(Self {
            site: site.clone(),
            renderer: SiteRenderer::new(&site.config)?,
        })
    }

    /// Generate the entire site from the listed posts
    pub fn generate(&self, posts: &[Post]) -> Result<()> {
        let now = Utc::now();

        fs::create_dir_all(&self.site.public_dir)?;

        // Copy static assets (css, images, etc.)
        self.copy_static_assets()?;

        self.write_page("index.html", &self.renderer.render_home(posts, now)?)?;
        self.write_page("blog/index.html", &self.renderer.render_blog(posts, now)?)?;

        for post in posts {
            let html = self.renderer.render_post(post, now)?;
            self.write_page(&format!("blog/{}/index.html", post.slug), &html)?;
        }
        tracing::info!("Generated {} post pages", posts.len());

        self.write_page("404.html", &self.renderer.render_not_found(now)?)?;
        self.write_page("sitemap.xml", &self.renderer.render_sitemap(posts, now))?;
        tracing::info!("Generated sitemap.xml");

        Ok(())
    }

    fn write_page(&self, relative: &str, contents: &str) -> Result<()> {
        let output_path = self.site.public_dir.join(relative);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create dir {:?}", parent))?;
        }
        fs::write(&output_path, contents)
            .with_context(|| format!("Failed to write {:?}", output_path))?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }

    /// Copy the static directory into the public directory
    fn copy_static_assets(&self) -> Result<()> {
        copy_dir(&self.site.static_dir, &self.site.public_dir)
    }
}

/// Recursively copy files from `from` into `to`. A missing source is a no-op.
fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    if !from.exists() {
        return Ok(());
    }

    let mut copied = 0;
    for entry in WalkDir::new(from)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let relative = path.strip_prefix(from)?;
        let dest = to.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(path, &dest)?;
        copied += 1;
    }

    tracing::debug!("Copied {} static files from {:?}", copied, from);
    Ok(())
}
