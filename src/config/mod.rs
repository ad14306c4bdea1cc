//! Configuration module

mod site;

pub use site::ComponentConfig;
pub use site::FaqItem;
pub use site::FeatureItem;
pub use site::HighlightConfig;
pub use site::Mode;
pub use site::SiteConfig;
