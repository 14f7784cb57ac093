//! Uploaded media: slots, content-type rules and object keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::Collection;

/// A media attachment position on a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaSlot {
    Image,
    Video,
    Pdf,
    /// Poster frame for a video or cover for a PDF, captured client-side.
    Thumbnail,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    #[error("unknown media slot: {0}")]
    UnknownSlot(String),
    #[error("{label} does not accept {slot} uploads")]
    SlotNotAllowed { label: &'static str, slot: MediaSlot },
    #[error("{slot} upload has content type {content_type}, expected {expected}")]
    WrongContentType {
        slot: MediaSlot,
        content_type: String,
        expected: &'static str,
    },
    #[error("more than one {0} upload")]
    DuplicateSlot(MediaSlot),
    #[error("{slot} upload is empty")]
    Empty { slot: MediaSlot },
    #[error("{slot} upload is {size} bytes, limit is {limit}")]
    TooLarge {
        slot: MediaSlot,
        size: usize,
        limit: usize,
    },
}

impl MediaSlot {
    pub const ALL: [MediaSlot; 4] = [
        MediaSlot::Image,
        MediaSlot::Video,
        MediaSlot::Pdf,
        MediaSlot::Thumbnail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaSlot::Image => "image",
            MediaSlot::Video => "video",
            MediaSlot::Pdf => "pdf",
            MediaSlot::Thumbnail => "thumbnail",
        }
    }

    /// Document field holding the public URL.
    pub fn url_field(&self) -> &'static str {
        match self {
            MediaSlot::Image => "imageUrl",
            MediaSlot::Video => "videoUrl",
            MediaSlot::Pdf => "pdfUrl",
            MediaSlot::Thumbnail => "thumbnailUrl",
        }
    }

    /// Document field holding the storage key.
    pub fn path_field(&self) -> &'static str {
        match self {
            MediaSlot::Image => "imagePath",
            MediaSlot::Video => "videoPath",
            MediaSlot::Pdf => "pdfPath",
            MediaSlot::Thumbnail => "thumbnailPath",
        }
    }

    fn expected_type(&self) -> &'static str {
        match self {
            MediaSlot::Image | MediaSlot::Thumbnail => "image/*",
            MediaSlot::Video => "video/*",
            MediaSlot::Pdf => "application/pdf",
        }
    }

    pub fn accepts(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match self {
            MediaSlot::Image | MediaSlot::Thumbnail => essence.starts_with("image/"),
            MediaSlot::Video => essence.starts_with("video/"),
            MediaSlot::Pdf => essence == "application/pdf",
        }
    }
}

impl fmt::Display for MediaSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaSlot {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MediaSlot::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| MediaError::UnknownSlot(s.to_string()))
    }
}

/// Slots a collection's documents may carry.
pub fn allowed_slots(collection: Collection) -> &'static [MediaSlot] {
    match collection {
        Collection::Blogs
        | Collection::FeatureStories
        | Collection::Photos
        | Collection::TeamMembers => &[MediaSlot::Image],
        Collection::Videos => &[MediaSlot::Video, MediaSlot::Thumbnail],
        Collection::Pdfs => &[MediaSlot::Pdf, MediaSlot::Thumbnail],
        Collection::Banners => &[MediaSlot::Image, MediaSlot::Video],
        Collection::Tags => &[],
    }
}

/// Slots of which at least one must be filled, if any.
///
/// Videos are absent here: a YouTube link can stand in for an upload, so
/// the service checks them separately.
pub fn required_any_of(collection: Collection) -> &'static [MediaSlot] {
    match collection {
        Collection::Photos => &[MediaSlot::Image],
        Collection::Pdfs => &[MediaSlot::Pdf],
        Collection::Banners => &[MediaSlot::Image, MediaSlot::Video],
        _ => &[],
    }
}

/// A file submitted with a form.
#[derive(Clone)]
pub struct MediaUpload {
    pub slot: MediaSlot,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for MediaUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaUpload")
            .field("slot", &self.slot)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl MediaUpload {
    pub fn check(&self, collection: Collection, max_bytes: usize) -> Result<(), MediaError> {
        if !allowed_slots(collection).contains(&self.slot) {
            return Err(MediaError::SlotNotAllowed {
                label: collection.label(),
                slot: self.slot,
            });
        }
        if !self.slot.accepts(&self.content_type) {
            return Err(MediaError::WrongContentType {
                slot: self.slot,
                content_type: self.content_type.clone(),
                expected: self.slot.expected_type(),
            });
        }
        if self.bytes.is_empty() {
            return Err(MediaError::Empty { slot: self.slot });
        }
        if self.bytes.len() > max_bytes {
            return Err(MediaError::TooLarge {
                slot: self.slot,
                size: self.bytes.len(),
                limit: max_bytes,
            });
        }
        Ok(())
    }
}

/// Keep `[A-Za-z0-9._-]`, replace anything else with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Storage key for a new upload: `{folder}/{slot}/{uuid}-{file name}`.
pub fn object_key(collection: Collection, slot: MediaSlot, file_name: &str) -> String {
    format!(
        "{}/{}/{}-{}",
        collection.storage_folder(),
        slot,
        Uuid::new_v4().simple(),
        sanitize_file_name(file_name)
    )
}
