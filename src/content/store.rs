//! Post store - loads posts from the flat content directory

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{Category, FrontMatter, FrontMatterError, Post, ReadingTime};
use crate::config::{Mode, SiteConfig};

/// Extensions recognised as posts, in lookup priority order
const POST_EXTENSIONS: [&str; 2] = ["mdx", "md"];

/// Errors raised while loading posts
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid front-matter in {path:?}: {source}")]
    FrontMatter {
        path: PathBuf,
        #[source]
        source: FrontMatterError,
    },

    #[error("duplicate slug '{slug}': {first:?} and {second:?}")]
    DuplicateSlug {
        slug: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Reads posts from a directory of `.mdx`/`.md` files
#[derive(Debug, Clone)]
pub struct PostStore {
    content_dir: PathBuf,
    mode: Mode,
    words_per_minute: usize,
    strict: bool,
}

impl PostStore {
    /// Create a store over `content_dir`
    pub fn new<P: AsRef<Path>>(content_dir: P, mode: Mode) -> Self {
        Self {
            content_dir: content_dir.as_ref().to_path_buf(),
            mode,
            words_per_minute: 200,
            strict: false,
        }
    }

    /// Create a store using the site's blog settings
    pub fn from_config<P: AsRef<Path>>(content_dir: P, config: &SiteConfig) -> Self {
        Self::new(content_dir, config.mode)
            .with_words_per_minute(config.words_per_minute)
            .with_strict(config.strict)
    }

    pub fn with_words_per_minute(mut self, words_per_minute: usize) -> Self {
        self.words_per_minute = words_per_minute;
        self
    }

    /// In strict mode a malformed post fails the whole listing
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// Whether a post may be shown publicly in the current mode
    pub fn is_visible(&self, post: &Post) -> bool {
        !(post.draft && self.mode.is_production())
    }

    /// Load all posts, newest first. Drafts are dropped in production.
    /// Posts published at the same instant are ordered by slug.
    pub fn list_posts(&self) -> Result<Vec<Post>, ContentError> {
        if !self.content_dir.exists() {
            tracing::debug!("Content directory {:?} does not exist", self.content_dir);
            return Ok(Vec::new());
        }

        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        let mut posts = Vec::new();

        for entry in WalkDir::new(&self.content_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            let Some(slug) = post_slug(path) else {
                continue;
            };

            if let Some(first) = seen.get(&slug) {
                return Err(ContentError::DuplicateSlug {
                    slug,
                    first: first.clone(),
                    second: path.to_path_buf(),
                });
            }
            seen.insert(slug.clone(), path.to_path_buf());

            match self.load_post(path, slug) {
                Ok(post) => {
                    if self.is_visible(&post) {
                        posts.push(post);
                    } else {
                        tracing::debug!("Skipping draft {:?}", path);
                    }
                }
                Err(e) if self.strict => return Err(e),
                Err(e) => {
                    tracing::warn!("Failed to load post {:?}: {}", path, e);
                }
            }
        }

        // Sort by date descending (newest first), then by slug
        posts.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| a.slug.cmp(&b.slug))
        });

        Ok(posts)
    }

    /// Look up a single post by slug. Drafts are returned too; callers
    /// decide visibility with [`PostStore::is_visible`].
    pub fn get_post(&self, slug: &str) -> Option<Post> {
        if !is_valid_slug(slug) {
            return None;
        }

        for ext in POST_EXTENSIONS {
            let path = self.content_dir.join(format!("{}.{}", slug, ext));
            if !path.is_file() {
                continue;
            }
            return match self.load_post(&path, slug.to_string()) {
                Ok(post) => Some(post),
                Err(e) => {
                    tracing::warn!("Failed to load post {:?}: {}", path, e);
                    None
                }
            };
        }

        None
    }

    /// Featured posts, newest first
    pub fn featured_posts(&self) -> Result<Vec<Post>, ContentError> {
        Ok(self
            .list_posts()?
            .into_iter()
            .filter(|post| post.featured)
            .collect())
    }

    /// Posts in one category, newest first
    pub fn posts_by_category(&self, category: Category) -> Result<Vec<Post>, ContentError> {
        Ok(self
            .list_posts()?
            .into_iter()
            .filter(|post| post.category == category)
            .collect())
    }

    /// The `limit` newest posts
    pub fn recent_posts(&self, limit: usize) -> Result<Vec<Post>, ContentError> {
        let mut posts = self.list_posts()?;
        posts.truncate(limit);
        Ok(posts)
    }

    /// Tag usage counts, sorted by tag name
    pub fn tags(&self) -> Result<BTreeMap<String, usize>, ContentError> {
        let mut tags = BTreeMap::new();
        for post in self.list_posts()? {
            for tag in post.tags {
                if tag.trim().is_empty() {
                    continue;
                }
                *tags.entry(tag).or_insert(0) += 1;
            }
        }
        Ok(tags)
    }

    /// Load a single post from a file
    fn load_post(&self, path: &Path, slug: String) -> Result<Post, ContentError> {
        let content = fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let front_matter_error = |source| ContentError::FrontMatter {
            path: path.to_path_buf(),
            source,
        };

        let (fm, body) = FrontMatter::parse(&content).map_err(front_matter_error)?;
        let reading_time = ReadingTime::estimate(body, self.words_per_minute).text;

        Post::from_front_matter(slug, fm, body, reading_time, path.to_path_buf())
            .map_err(front_matter_error)
    }
}

/// Slug of a post file, or `None` if the file is not a post
fn post_slug(path: &Path) -> Option<String> {
    if !path.is_file() {
        return None;
    }
    let ext = path.extension().and_then(|e| e.to_str())?;
    if !POST_EXTENSIONS.contains(&ext) {
        return None;
    }
    let slug = path.file_stem().and_then(|s| s.to_str())?;
    is_valid_slug(slug).then(|| slug.to_string())
}

/// A slug must name a file directly inside the content directory
fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('.')
        && !slug.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_post(dir: &Path, file: &str, published: &str, extra: &str) {
        let content = format!(
            "---\ntitle: {file}\ndescription: About {file}\npublishedAt: {published}\nauthor:\n  name: Ana\ncategory: training-tips\n{extra}---\n\nSome words about {file}.\n"
        );
        fs::write(dir.join(file), content).unwrap();
    }

    /// A (2024-01-01), B (2024-06-01, draft), C (2024-03-01)
    fn sample_store() -> TempDir {
        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "a.mdx", "2024-01-01", "");
        write_post(dir.path(), "b.mdx", "2024-06-01", "draft: true\n");
        write_post(dir.path(), "c.mdx", "2024-03-01", "");
        dir
    }

    fn slugs(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|p| p.slug.as_str()).collect()
    }

    #[test]
    fn test_production_excludes_drafts() {
        let dir = sample_store();
        let store = PostStore::new(dir.path(), Mode::Production);
        let posts = store.list_posts().unwrap();
        assert_eq!(slugs(&posts), vec!["c", "a"]);
        assert!(posts.iter().all(|p| !p.draft));
    }

    #[test]
    fn test_development_includes_drafts() {
        let dir = sample_store();
        let store = PostStore::new(dir.path(), Mode::Development);
        let posts = store.list_posts().unwrap();
        assert_eq!(slugs(&posts), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_sorted_non_increasing_with_slug_tiebreak() {
        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "zeta.mdx", "2024-05-01", "");
        write_post(dir.path(), "alpha.md", "2024-05-01", "");
        write_post(dir.path(), "old.mdx", "2023-12-31 23:59", "");
        write_post(dir.path(), "new.mdx", "2024-05-01T08:00:00Z", "");

        let posts = PostStore::new(dir.path(), Mode::Production)
            .list_posts()
            .unwrap();
        assert_eq!(slugs(&posts), vec!["new", "alpha", "zeta", "old"]);
        assert!(posts
            .windows(2)
            .all(|w| w[0].published_at >= w[1].published_at));
    }

    #[test]
    fn test_ignores_non_post_files_and_subdirectories() {
        let dir = sample_store();
        fs::write(dir.path().join("notes.txt"), "not a post").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        write_post(&dir.path().join("nested"), "deep.mdx", "2024-02-01", "");

        let posts = PostStore::new(dir.path(), Mode::Production)
            .list_posts()
            .unwrap();
        assert_eq!(slugs(&posts), vec!["c", "a"]);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = PostStore::new(dir.path().join("nope"), Mode::Production);
        assert!(store.list_posts().unwrap().is_empty());
        assert!(store.get_post("a").is_none());
    }

    #[test]
    fn test_get_post() {
        let dir = sample_store();
        let store = PostStore::new(dir.path(), Mode::Production);

        let post = store.get_post("c").unwrap();
        assert_eq!(post.slug, "c");
        assert_eq!(post.title, "c.mdx");
        assert_eq!(post.author.name, "Ana");
        assert_eq!(post.category, Category::TrainingTips);
        assert!(post.body.contains("Some words about c.mdx."));
        assert_eq!(post.reading_time, "1 min read");

        assert!(store.get_post("missing").is_none());
        assert!(store.get_post("").is_none());
        assert!(store.get_post("../c").is_none());
    }

    #[test]
    fn test_get_post_returns_drafts() {
        let dir = sample_store();
        let store = PostStore::new(dir.path(), Mode::Production);
        let draft = store.get_post("b").unwrap();
        assert!(draft.draft);
        assert!(!store.is_visible(&draft));
    }

    #[test]
    fn test_get_post_malformed_is_none() {
        let dir = sample_store();
        fs::write(dir.path().join("broken.mdx"), "---\ntitle: [oops\n---\n").unwrap();
        let store = PostStore::new(dir.path(), Mode::Production);
        assert!(store.get_post("broken").is_none());
    }

    #[test]
    fn test_malformed_post_skipped_unless_strict() {
        let dir = sample_store();
        fs::write(dir.path().join("broken.mdx"), "no front matter").unwrap();

        let lenient = PostStore::new(dir.path(), Mode::Production);
        assert_eq!(slugs(&lenient.list_posts().unwrap()), vec!["c", "a"]);

        let strict = lenient.with_strict(true);
        let err = strict.list_posts().unwrap_err();
        assert!(matches!(err, ContentError::FrontMatter { .. }));
    }

    #[test]
    fn test_duplicate_slug_is_an_error() {
        let dir = sample_store();
        write_post(dir.path(), "a.md", "2024-02-01", "");
        let err = PostStore::new(dir.path(), Mode::Production)
            .list_posts()
            .unwrap_err();
        assert!(matches!(err, ContentError::DuplicateSlug { slug, .. } if slug == "a"));
    }

    #[test]
    fn test_derived_helpers() {
        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "one.mdx", "2024-01-01", "featured: true\ntags: [guard, drills]\n");
        write_post(dir.path(), "two.mdx", "2024-02-01", "tags: drills\n");
        write_post(
            dir.path(),
            "three.mdx",
            "2024-03-01",
            "featured: true\ndraft: true\n",
        );
        fs::write(
            dir.path().join("four.mdx"),
            "---\ntitle: Four\ndescription: D\npublishedAt: 2024-04-01\nauthor: Ana\ncategory: product-updates\n---\nBody",
        )
        .unwrap();

        let store = PostStore::new(dir.path(), Mode::Production);
        assert_eq!(slugs(&store.featured_posts().unwrap()), vec!["one"]);
        assert_eq!(
            slugs(&store.posts_by_category(Category::ProductUpdates).unwrap()),
            vec!["four"]
        );
        assert!(store
            .posts_by_category(Category::Community)
            .unwrap()
            .is_empty());
        assert_eq!(slugs(&store.recent_posts(2).unwrap()), vec!["four", "two"]);
        assert_eq!(store.recent_posts(10).unwrap().len(), 3);

        let tags = store.tags().unwrap();
        assert_eq!(tags.get("drills"), Some(&2));
        assert_eq!(tags.get("guard"), Some(&1));
    }

    #[test]
    fn test_reading_time_uses_configured_pace() {
        let dir = TempDir::new().unwrap();
        let body = "word ".repeat(300);
        fs::write(
            dir.path().join("long.mdx"),
            format!("---\ntitle: Long\ndescription: D\npublishedAt: 2024-04-01\nauthor: Ana\ncategory: community\n---\n{body}"),
        )
        .unwrap();

        let fast = PostStore::new(dir.path(), Mode::Production).with_words_per_minute(300);
        assert_eq!(fast.get_post("long").unwrap().reading_time, "1 min read");

        let slow = PostStore::new(dir.path(), Mode::Production).with_words_per_minute(100);
        assert_eq!(slow.get_post("long").unwrap().reading_time, "3 min read");
    }
}
