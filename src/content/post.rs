//! Post and Author models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{Category, FrontMatter};
use crate::helpers::encode_url;

/// Author of a post. Front-matter may give just a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AuthorRepr")]
pub struct Author {
    pub name: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub twitter: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AuthorRepr {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        avatar: Option<String>,
        #[serde(default)]
        bio: Option<String>,
        #[serde(default)]
        twitter: Option<String>,
    },
}

impl From<AuthorRepr> for Author {
    fn from(repr: AuthorRepr) -> Self {
        match repr {
            AuthorRepr::Name(name) => Author::named(name),
            AuthorRepr::Full {
                name,
                avatar,
                bio,
                twitter,
            } => Author {
                name,
                avatar,
                bio,
                twitter,
            },
        }
    }
}

impl Author {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            avatar: None,
            bio: None,
            twitter: None,
        }
    }

    /// First character of the name, used for the avatar placeholder
    pub fn initial(&self) -> String {
        self.name
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    }
}

/// A blog post
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    /// Slug (file stem, unique within the store)
    pub slug: String,

    /// Post title
    pub title: String,

    /// Short summary shown on cards and in meta tags
    pub description: String,

    /// Publication date
    pub published_at: DateTime<Utc>,

    /// Last updated date
    pub updated_at: Option<DateTime<Utc>>,

    pub author: Author,

    pub category: Category,

    pub tags: Vec<String>,

    pub cover_image: Option<String>,

    pub cover_image_alt: Option<String>,

    pub featured: bool,

    pub draft: bool,

    /// Human readable reading time, e.g. "4 min read"
    pub reading_time: String,

    /// Raw MDX body (without front-matter)
    pub body: String,

    /// Full source file path
    #[serde(skip)]
    pub full_source: PathBuf,
}

impl Post {
    /// Build a post from parsed front-matter. Dates must already have been
    /// validated by [`FrontMatter::parse`].
    pub fn from_front_matter(
        slug: String,
        fm: FrontMatter,
        body: &str,
        reading_time: String,
        full_source: PathBuf,
    ) -> Result<Self, super::FrontMatterError> {
        let published_at = fm.published()?;
        let updated_at = fm.updated()?;

        Ok(Self {
            slug,
            title: fm.title,
            description: fm.description,
            published_at,
            updated_at,
            author: fm.author,
            category: fm.category,
            tags: fm.tags,
            cover_image: fm.cover_image,
            cover_image_alt: fm.cover_image_alt,
            featured: fm.featured,
            draft: fm.draft,
            reading_time,
            body: body.to_string(),
            full_source,
        })
    }

    /// Date used as the sitemap last-modified value
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.published_at)
    }

    /// Site-relative URL path of the post, with the slug percent-encoded
    pub fn path(&self) -> String {
        format!("/blog/{}", encode_url(&self.slug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_full_form() {
        let author: Author =
            serde_yaml::from_str("name: Ana\nbio: Coach\ntwitter: '@ana'\n").unwrap();
        assert_eq!(author.name, "Ana");
        assert_eq!(author.bio.as_deref(), Some("Coach"));
        assert_eq!(author.twitter.as_deref(), Some("@ana"));
    }

    #[test]
    fn test_author_initial() {
        assert_eq!(Author::named("ana").initial(), "A");
        assert_eq!(Author::named("").initial(), "");
        assert_eq!(Author::named("Álvaro").initial(), "Á");
    }

    #[test]
    fn test_last_modified_prefers_updated() {
        let (fm, body) = FrontMatter::parse(
            "---\ntitle: T\ndescription: D\npublishedAt: 2024-01-01\nupdatedAt: 2024-02-01\nauthor: Ana\ncategory: community\n---\nBody",
        )
        .unwrap();
        let post = Post::from_front_matter(
            "t".to_string(),
            fm,
            body,
            "1 min read".to_string(),
            PathBuf::from("t.mdx"),
        )
        .unwrap();
        assert_eq!(post.last_modified().format("%Y-%m-%d").to_string(), "2024-02-01");
        assert_eq!(post.path(), "/blog/t");
    }

    #[test]
    fn test_path_encodes_slug() {
        let (fm, body) = FrontMatter::parse(
            "---\ntitle: T\ndescription: D\npublishedAt: 2024-01-01\nauthor: Ana\ncategory: community\n---\nBody",
        )
        .unwrap();
        let post = Post::from_front_matter(
            "avanço notes".to_string(),
            fm,
            body,
            "1 min read".to_string(),
            PathBuf::from("avanço notes.mdx"),
        )
        .unwrap();
        assert_eq!(post.path(), "/blog/avan%C3%A7o%20notes");
    }
}
