//! List site content

use anyhow::Result;
use std::fmt::Write as _;

use crate::content::{Category, Post};
use crate::Site;

/// List site content by type
pub fn run(site: &Site, content_type: &str) -> Result<()> {
    print!("{}", render(site, content_type)?);
    Ok(())
}

/// Build the listing printed by `run`
pub fn render(site: &Site, content_type: &str) -> Result<String> {
    let store = site.store();
    let mut out = String::new();

    match content_type {
        "post" | "posts" => {
            let posts = store.list_posts()?;
            writeln!(out, "Posts ({}):", posts.len())?;
            for post in &posts {
                writeln!(out, "  {}", post_line(post))?;
            }
        }
        "category" | "categories" => {
            let posts = store.list_posts()?;
            writeln!(out, "Categories ({}):", Category::ALL.len())?;
            for category in Category::ALL {
                let count = posts.iter().filter(|p| p.category == category).count();
                writeln!(
                    out,
                    "  {} [{}] ({})",
                    category.display_name(),
                    category.slug(),
                    count
                )?;
            }
        }
        "tag" | "tags" => {
            let tags = store.tags()?;
            writeln!(out, "Tags ({}):", tags.len())?;
            for (tag, count) in tags {
                writeln!(out, "  {} ({})", tag, count)?;
            }
        }
        _ => {
            anyhow::bail!(
                "Unknown type: {}. Available: posts, categories, tags",
                content_type
            );
        }
    }

    Ok(out)
}

fn post_line(post: &Post) -> String {
    let mut flags = String::new();
    if post.featured {
        flags.push_str(" *featured*");
    }
    if post.draft {
        flags.push_str(" (draft)");
    }
    format!(
        "{} - {} [{}] {}{}",
        post.published_at.format("%Y-%m-%d"),
        post.title,
        post.slug,
        post.reading_time,
        flags
    )
}
