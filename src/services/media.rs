//! Media service — append-only gallery of uploaded images and videos.
//!
//! DESIGN
//! ======
//! An upload is classified only by its MIME type: `image/*` is an image and
//! everything else is treated as video, including types that are neither.
//! There is no size or type validation beyond that. Items are immutable and
//! never deleted; ids are ordinals starting from 1. Followers `record` the
//! leader's items under the leader's ids.
//!
//! The binary content stays with the hosting environment. The gallery keeps
//! an opaque `ResourceRef` that a renderer can resolve locally.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::frame::{Data, Frame, SYSCALL_MEDIA_UPLOAD, now_ms};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a MIME type. Anything that is not `image/*` is video.
    #[must_use]
    pub fn classify(mime_type: &str) -> Self {
        if mime_type.trim().to_ascii_lowercase().starts_with("image") {
            Self::Image
        } else {
            Self::Video
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

/// Opaque handle to uploaded binary content, resolvable by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef(String);

impl ResourceRef {
    /// Wrap a reference issued elsewhere, e.g. one carried by a frame.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    fn issue() -> Self {
        Self(format!("blob:cinesync/{}", Uuid::new_v4()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file chosen through the file input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub name: String,
    /// MIME type hint reported by the picker. May be empty.
    pub mime_type: String,
    pub size: u64,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, size: u64) -> Self {
        Self { name: name.into(), mime_type: mime_type.into(), size }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: u64,
    pub author: String,
    pub resource: ResourceRef,
    pub kind: MediaKind,
    pub file_name: String,
    pub mime_type: String,
    /// Milliseconds since Unix epoch.
    pub uploaded_at: i64,
}

impl MediaItem {
    /// Wire shape announcing this item to other participants.
    #[must_use]
    pub fn to_frame(&self) -> Frame {
        Frame::request(SYSCALL_MEDIA_UPLOAD, Data::new())
            .with_data("media_id", self.id)
            .with_data("author", self.author.clone())
            .with_data("kind", self.kind.as_str())
            .with_data("resource", self.resource.as_str())
            .with_data("file_name", self.file_name.clone())
            .with_data("mime_type", self.mime_type.clone())
            .with_data("uploaded_at", self.uploaded_at)
    }
}

// =============================================================================
// GALLERY
// =============================================================================

#[derive(Debug, Default)]
pub struct MediaGallery {
    items: Vec<MediaItem>,
}

impl MediaGallery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an uploaded file to the gallery.
    pub fn upload(&mut self, author: &str, file: FileHandle) -> &MediaItem {
        let id = self.items.last().map_or(1, |item| item.id + 1);
        let kind = MediaKind::classify(&file.mime_type);

        self.items.push(MediaItem {
            id,
            author: author.to_string(),
            resource: ResourceRef::issue(),
            kind,
            file_name: file.name,
            mime_type: file.mime_type,
            uploaded_at: now_ms(),
        });

        &self.items[self.items.len() - 1]
    }

    /// Store an item another participant uploaded, keeping ids in order.
    /// Returns `false` if an item with that id is already held.
    pub fn record(&mut self, item: MediaItem) -> bool {
        match self.items.binary_search_by_key(&item.id, |i| i.id) {
            Ok(_) => false,
            Err(pos) => {
                self.items.insert(pos, item);
                true
            }
        }
    }

    /// Every item in upload order.
    pub fn list(&self) -> impl Iterator<Item = &MediaItem> + '_ {
        self.items.iter()
    }

    #[must_use]
    pub fn get(&self, id: u64) -> Option<&MediaItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn by_author<'a>(&'a self, author: &'a str) -> impl Iterator<Item = &'a MediaItem> + 'a {
        self.items.iter().filter(move |item| item.author == author)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
#[path = "media_test.rs"]
mod tests;
