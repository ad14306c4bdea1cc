//! Built-in site templates using the Tera template engine
//!
//! Templates are embedded directly in the binary.

use anyhow::Result;
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::{FaqItem, FeatureItem, SiteConfig};
use crate::content::{Author, Category, Post};
use crate::helpers::{format_date, full_url_for};

/// Template renderer with the embedded site templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Front-matter text is escaped; compiled bodies are marked `safe`
        tera.autoescape_on(vec![".html"]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("index.html", include_str!("site/index.html")),
            ("blog.html", include_str!("site/blog.html")),
            ("post.html", include_str!("site/post.html")),
            ("404.html", include_str!("site/404.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("site/partials/header.html"),
            ),
            (
                "partials/footer.html",
                include_str!("site/partials/footer.html"),
            ),
            ("partials/card.html", include_str!("site/partials/card.html")),
            (
                "partials/avatar.html",
                include_str!("site/partials/avatar.html"),
            ),
        ])?;

        tera.register_filter("date_format", date_format_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: format an RFC 3339 date string with a date-fns pattern
fn date_format_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("date_format", "value", String, value);
    let format = match args.get("format") {
        Some(val) => tera::try_get_value!("date_format", "format", String, val),
        None => "MMM d, yyyy".to_string(),
    };

    match DateTime::parse_from_rfc3339(&s) {
        Ok(date) => Ok(tera::Value::String(format_date(
            &date.with_timezone(&Utc),
            &format,
        ))),
        Err(_) => Err(tera::Error::msg(format!(
            "date_format: '{}' is not an RFC 3339 date",
            s
        ))),
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub tagline: String,
    pub description: String,
    pub url: String,
    pub language: String,
    pub author: String,
    pub keywords: String,
    pub year: i32,
    pub features: Vec<FeatureItem>,
    pub faq: Vec<FaqItem>,
}

impl SiteData {
    pub fn new(config: &SiteConfig, now: DateTime<Utc>) -> Self {
        Self {
            title: config.title.clone(),
            tagline: config.tagline.clone(),
            description: config.description.clone(),
            url: config.url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
            author: config.author.clone(),
            keywords: config.keywords.join(", "),
            year: now.year(),
            features: config.features.clone(),
            faq: config.faq.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryData {
    pub slug: &'static str,
    pub name: &'static str,
    pub badge_class: &'static str,
}

impl From<Category> for CategoryData {
    fn from(category: Category) -> Self {
        Self {
            slug: category.slug(),
            name: category.display_name(),
            badge_class: category.badge_class(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorData {
    pub name: String,
    pub initial: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub twitter: Option<String>,
}

impl From<&Author> for AuthorData {
    fn from(author: &Author) -> Self {
        Self {
            name: author.name.clone(),
            initial: author.initial(),
            avatar: author.avatar.clone(),
            bio: author.bio.clone(),
            twitter: author.twitter.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub path: String,
    pub permalink: String,
    /// RFC 3339
    pub published_at: String,
    /// RFC 3339
    pub updated_at: Option<String>,
    pub author: AuthorData,
    pub category: CategoryData,
    pub tags: Vec<String>,
    pub cover_image: Option<String>,
    /// Falls back to the title
    pub cover_image_alt: String,
    pub featured: bool,
    pub reading_time: String,
    /// Compiled HTML body, only filled for the detail page
    pub content: Option<String>,
}

impl PostData {
    pub fn new(post: &Post, config: &SiteConfig) -> Self {
        let path = post.path();
        Self {
            slug: post.slug.clone(),
            title: post.title.clone(),
            description: post.description.clone(),
            permalink: full_url_for(config, &path),
            path,
            published_at: post.published_at.to_rfc3339(),
            updated_at: post.updated_at.map(|d| d.to_rfc3339()),
            author: AuthorData::from(&post.author),
            category: CategoryData::from(post.category),
            tags: post.tags.clone(),
            cover_image: post.cover_image.clone(),
            cover_image_alt: post
                .cover_image_alt
                .clone()
                .unwrap_or_else(|| post.title.clone()),
            featured: post.featured,
            reading_time: post.reading_time.clone(),
            content: None,
        }
    }

    pub fn with_content(mut self, html: String) -> Self {
        self.content = Some(html);
        self
    }
}

/// Posts arranged for the blog listing: the first featured post is
/// highlighted, everything else goes in the grid.
#[derive(Debug, Clone, Serialize)]
pub struct BlogListing {
    pub featured: Option<PostData>,
    pub grid: Vec<PostData>,
    pub total: usize,
}

impl BlogListing {
    pub fn new(posts: &[Post], config: &SiteConfig) -> Self {
        let mut featured: Vec<PostData> = Vec::new();
        let mut regular: Vec<PostData> = Vec::new();
        for post in posts {
            let data = PostData::new(post, config);
            if post.featured {
                featured.push(data);
            } else {
                regular.push(data);
            }
        }

        let mut featured = featured.into_iter();
        let highlighted = featured.next();
        let grid = featured.chain(regular).collect();

        Self {
            featured: highlighted,
            grid,
            total: posts.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::FrontMatter;
    use std::path::PathBuf;

    fn post(slug: &str, published: &str, featured: bool) -> Post {
        let source = format!(
            "---\ntitle: Post {slug}\ndescription: D\npublishedAt: {published}\nauthor:\n  name: ana\n  bio: Coach\ncategory: community\nfeatured: {featured}\ntags: [a, b, c, d]\n---\nBody"
        );
        let (fm, body) = FrontMatter::parse(&source).unwrap();
        Post::from_front_matter(
            slug.to_string(),
            fm,
            body,
            "1 min read".to_string(),
            PathBuf::from(format!("{slug}.mdx")),
        )
        .unwrap()
    }

    #[test]
    fn test_post_data() {
        let config = SiteConfig::default();
        let data = PostData::new(&post("guard", "2024-01-05", false), &config);
        assert_eq!(data.path, "/blog/guard");
        assert_eq!(data.permalink, "https://avanco.ai/blog/guard");
        assert_eq!(data.published_at, "2024-01-05T00:00:00+00:00");
        assert_eq!(data.author.initial, "A");
        assert_eq!(data.category.name, "Community");
        assert_eq!(data.cover_image_alt, "Post guard");
        assert!(data.content.is_none());
    }

    #[test]
    fn test_blog_listing_highlights_first_featured() {
        let config = SiteConfig::default();
        let posts = vec![
            post("newest", "2024-05-01", false),
            post("feat1", "2024-04-01", true),
            post("mid", "2024-03-01", false),
            post("feat2", "2024-02-01", true),
        ];
        let listing = BlogListing::new(&posts, &config);
        assert_eq!(listing.featured.as_ref().map(|p| p.slug.as_str()), Some("feat1"));
        let grid: Vec<_> = listing.grid.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(grid, vec!["feat2", "newest", "mid"]);
        assert_eq!(listing.total, 4);
    }

    #[test]
    fn test_blog_listing_without_featured() {
        let config = SiteConfig::default();
        let listing = BlogListing::new(&[post("a", "2024-01-01", false)], &config);
        assert!(listing.featured.is_none());
        assert_eq!(listing.grid.len(), 1);
    }

    #[test]
    fn test_templates_compile() {
        assert!(TemplateRenderer::new().is_ok());
    }

    #[test]
    fn test_date_format_filter() {
        let mut args = HashMap::new();
        args.insert(
            "format".to_string(),
            tera::Value::String("MMMM d, yyyy".to_string()),
        );
        let value = tera::Value::String("2024-03-09T00:00:00+00:00".to_string());
        let formatted = date_format_filter(&value, &args).unwrap();
        assert_eq!(formatted, tera::Value::String("March 9, 2024".to_string()));

        let bad = tera::Value::String("yesterday".to_string());
        assert!(date_format_filter(&bad, &HashMap::new()).is_err());
    }
}
