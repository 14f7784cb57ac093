use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Named document collections backing the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    #[serde(rename = "blogs")]
    Blogs,
    #[serde(rename = "featureStories")]
    FeatureStories,
    #[serde(rename = "photos")]
    Photos,
    #[serde(rename = "videos")]
    Videos,
    #[serde(rename = "pdfs")]
    Pdfs,
    #[serde(rename = "team_members")]
    TeamMembers,
    #[serde(rename = "banners")]
    Banners,
    #[serde(rename = "tags")]
    Tags,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown collection: {0}")]
pub struct UnknownCollection(pub String);

impl Collection {
    pub const ALL: [Collection; 8] = [
        Collection::Blogs,
        Collection::FeatureStories,
        Collection::Photos,
        Collection::Videos,
        Collection::Pdfs,
        Collection::TeamMembers,
        Collection::Banners,
        Collection::Tags,
    ];

    /// Collection name as stored in the document database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Blogs => "blogs",
            Collection::FeatureStories => "featureStories",
            Collection::Photos => "photos",
            Collection::Videos => "videos",
            Collection::Pdfs => "pdfs",
            Collection::TeamMembers => "team_members",
            Collection::Banners => "banners",
            Collection::Tags => "tags",
        }
    }

    /// Human label used in user-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            Collection::Blogs => "blog",
            Collection::FeatureStories => "feature story",
            Collection::Photos => "photo",
            Collection::Videos => "video",
            Collection::Pdfs => "PDF",
            Collection::TeamMembers => "team member",
            Collection::Banners => "banner",
            Collection::Tags => "tag",
        }
    }

    /// Field holding the display title of a document.
    pub fn title_field(&self) -> &'static str {
        match self {
            Collection::TeamMembers | Collection::Tags => "name",
            _ => "title",
        }
    }

    /// Object-storage folder for the collection's uploaded media.
    pub fn storage_folder(&self) -> &'static str {
        self.as_str()
    }

    /// Whether site search covers this collection.
    pub fn searchable(&self) -> bool {
        !matches!(self, Collection::Tags)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = UnknownCollection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCollection(s.to_string()))
    }
}
