//! Front-matter parsing

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{Author, Category};

/// Custom deserializer that handles both a single string and a list of strings
fn string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, SeqAccess, Visitor};
    use std::fmt;

    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
        where
            S: SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(item) = seq.next_element::<String>()? {
                vec.push(item);
            }
            Ok(vec)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

/// Front-matter of a blog post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontMatter {
    pub title: String,
    pub description: String,
    pub published_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    pub author: Author,
    pub category: Category,
    #[serde(deserialize_with = "string_or_vec", default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub cover_image_alt: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub draft: bool,
}

/// Errors raised while reading a front-matter block
#[derive(Debug, thiserror::Error)]
pub enum FrontMatterError {
    #[error("missing front-matter block - file must start with ---")]
    Missing,

    #[error("unclosed front-matter block - missing closing ---")]
    Unclosed,

    #[error("invalid YAML in front-matter: {0}")]
    InvalidYaml(String),

    #[error("invalid date in '{field}': {value}")]
    InvalidDate { field: &'static str, value: String },
}

impl FrontMatter {
    /// Parse front-matter from content string
    /// Returns (front_matter, remaining_content)
    pub fn parse(content: &str) -> Result<(Self, &str), FrontMatterError> {
        let content = content.trim_start_matches('\u{feff}').trim_start();

        let rest = content
            .strip_prefix("---")
            .ok_or(FrontMatterError::Missing)?;
        let rest = rest.trim_start_matches([' ', '\t']);
        let rest = rest
            .strip_prefix("\r\n")
            .or_else(|| rest.strip_prefix('\n'))
            .ok_or(FrontMatterError::Missing)?;

        // The block ends at the first line consisting only of ---
        let mut offset = 0;
        let mut split = None;
        for line in rest.split_inclusive('\n') {
            if line.trim_end() == "---" {
                split = Some((&rest[..offset], &rest[offset + line.len()..]));
                break;
            }
            offset += line.len();
        }
        let (yaml_content, remaining) = split.ok_or(FrontMatterError::Unclosed)?;
        let remaining = remaining.trim_start_matches(['\n', '\r']);

        let fm: FrontMatter = serde_yaml::from_str(yaml_content)
            .map_err(|e| FrontMatterError::InvalidYaml(e.to_string()))?;

        // Reject unparseable dates up-front so sorting never sees them
        fm.published()?;
        fm.updated()?;

        Ok((fm, remaining))
    }

    /// Parse the publish date
    pub fn published(&self) -> Result<DateTime<Utc>, FrontMatterError> {
        parse_date_string(&self.published_at).ok_or_else(|| FrontMatterError::InvalidDate {
            field: "publishedAt",
            value: self.published_at.clone(),
        })
    }

    /// Parse the updated date, if any
    pub fn updated(&self) -> Result<Option<DateTime<Utc>>, FrontMatterError> {
        match &self.updated_at {
            None => Ok(None),
            Some(s) => parse_date_string(s)
                .map(Some)
                .ok_or_else(|| FrontMatterError::InvalidDate {
                    field: "updatedAt",
                    value: s.clone(),
                }),
        }
    }
}

/// Parse a date string in various formats. Values without an offset are UTC.
pub fn parse_date_string(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    // Try RFC 3339 / ISO 8601 with offset
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }

    None
}
