//! The closed set of blog categories

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Blog category. Stored in front-matter in kebab-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    BjjTechniques,
    TrainingTips,
    ProductUpdates,
    Community,
    GettingStarted,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::BjjTechniques,
        Category::TrainingTips,
        Category::ProductUpdates,
        Category::Community,
        Category::GettingStarted,
    ];

    /// The identifier used in front-matter and URLs
    pub fn slug(self) -> &'static str {
        match self {
            Category::BjjTechniques => "bjj-techniques",
            Category::TrainingTips => "training-tips",
            Category::ProductUpdates => "product-updates",
            Category::Community => "community",
            Category::GettingStarted => "getting-started",
        }
    }

    /// Human readable name
    pub fn display_name(self) -> &'static str {
        match self {
            Category::BjjTechniques => "BJJ Techniques",
            Category::TrainingTips => "Training Tips",
            Category::ProductUpdates => "Product Updates",
            Category::Community => "Community",
            Category::GettingStarted => "Getting Started",
        }
    }

    /// CSS classes for the category badge
    pub fn badge_class(self) -> &'static str {
        match self {
            Category::BjjTechniques => "bg-blue-100 text-blue-700 border-blue-200",
            Category::TrainingTips => "bg-emerald-100 text-emerald-700 border-emerald-200",
            Category::ProductUpdates => "bg-purple-100 text-purple-700 border-purple-200",
            Category::Community => "bg-amber-100 text-amber-700 border-amber-200",
            Category::GettingStarted => "bg-rose-100 text-rose-700 border-rose-200",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.slug() == s)
            .ok_or_else(|| {
                let known: Vec<_> = Category::ALL.iter().map(|c| c.slug()).collect();
                format!("unknown category '{}', expected one of: {}", s, known.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_round_trips_through_from_str() {
        for category in Category::ALL {
            assert_eq!(category.slug().parse::<Category>(), Ok(category));
        }
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let c: Category = serde_yaml::from_str("training-tips").unwrap();
        assert_eq!(c, Category::TrainingTips);
        assert!(serde_yaml::from_str::<Category>("recipes").is_err());
    }

    #[test]
    fn test_unknown_category_message_lists_choices() {
        let err = "recipes".parse::<Category>().unwrap_err();
        assert!(err.contains("recipes"));
        assert!(err.contains("getting-started"));
    }
}
