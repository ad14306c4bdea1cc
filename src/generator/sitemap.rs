//! XML sitemap generation

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::SiteConfig;
use crate::content::Post;
use crate::helpers::{date_xml, escape_xml, full_url_for};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFrequency {
    Weekly,
    Monthly,
}

impl ChangeFrequency {
    fn as_str(self) -> &'static str {
        match self {
            ChangeFrequency::Weekly => "weekly",
            ChangeFrequency::Monthly => "monthly",
        }
    }
}

/// One `<url>` of the sitemap
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SitemapEntry {
    pub url: String,
    pub last_modified: DateTime<Utc>,
    pub change_frequency: ChangeFrequency,
    pub priority: f32,
}

/// Landing page, blog index, then one entry per listed post.
/// Static pages are stamped with `now`; posts with their last update.
pub fn build_sitemap(config: &SiteConfig, posts: &[Post], now: DateTime<Utc>) -> Vec<SitemapEntry> {
    let mut entries = vec![
        SitemapEntry {
            url: full_url_for(config, "/"),
            last_modified: now,
            change_frequency: ChangeFrequency::Monthly,
            priority: 1.0,
        },
        SitemapEntry {
            url: full_url_for(config, "/blog"),
            last_modified: now,
            change_frequency: ChangeFrequency::Weekly,
            priority: 0.8,
        },
    ];

    entries.extend(posts.iter().map(|post| SitemapEntry {
        url: full_url_for(config, &post.path()),
        last_modified: post.last_modified(),
        change_frequency: ChangeFrequency::Monthly,
        priority: 0.6,
    }));

    entries
}

/// Render entries as a sitemaps.org document
pub fn render_sitemap(entries: &[SitemapEntry]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
    xml.push('\n');

    for entry in entries {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&entry.url)));
        xml.push_str(&format!(
            "    <lastmod>{}</lastmod>\n",
            date_xml(&entry.last_modified)
        ));
        xml.push_str(&format!(
            "    <changefreq>{}</changefreq>\n",
            entry.change_frequency.as_str()
        ));
        xml.push_str(&format!("    <priority>{:.1}</priority>\n", entry.priority));
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}
