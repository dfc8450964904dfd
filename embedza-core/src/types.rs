use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Output of a post-processing pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedResult {
    #[serde(default)]
    pub snippets: Vec<Snippet>,
}

/// A candidate embeddable resource (thumbnail, player, image...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    #[serde(default)]
    pub href: String,
    /// MIME type or a shorthand category such as `"image"`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
    #[serde(default, skip_serializing_if = "Media::is_empty")]
    pub media: Media,
}

impl Snippet {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            self.tags.insert(tag);
        }
        self
    }

    pub fn with_media(mut self, media: Media) -> Self {
        self.media = media;
        self
    }

    pub fn is_type(&self, mime_type: &str) -> bool {
        self.mime_type.as_deref() == Some(mime_type)
    }
}

/// Insertion-ordered set of snippet labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Tags(Vec<String>);

impl Tags {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a tag. Returns false if it was already present.
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if self.contains(&tag) {
            return false;
        }
        self.0.push(tag);
        true
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    /// Append every tag from `other` not already present.
    pub fn union(&mut self, other: &Tags) {
        for tag in &other.0 {
            self.insert(tag.as_str());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for Tags {
    fn from(tags: Vec<String>) -> Self {
        let mut set = Tags::new();
        for tag in tags {
            set.insert(tag);
        }
        set
    }
}

impl From<Tags> for Vec<String> {
    fn from(tags: Tags) -> Self {
        tags.0
    }
}

impl<S: Into<String>> FromIterator<S> for Tags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Tags::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

/// A media attribute as supplied by fetchers: usually a number, sometimes a
/// raw string scraped from markup (`"640"`, `"100%"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MediaValue {
    Number(f64),
    Text(String),
    /// Anything else a fetcher put there (booleans, objects, arrays).
    Other(JsonValue),
}

impl MediaValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            MediaValue::Number(n) => Some(*n),
            MediaValue::Text(_) | MediaValue::Other(_) => None,
        }
    }
}

impl From<f64> for MediaValue {
    fn from(n: f64) -> Self {
        MediaValue::Number(n)
    }
}

impl From<&str> for MediaValue {
    fn from(s: &str) -> Self {
        MediaValue::Text(s.to_string())
    }
}

/// Named media attributes of a snippet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Media {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<MediaValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<MediaValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<MediaValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoplay: Option<String>,
    /// Provider-specific keys (`html`, `thumbnail_url`, ...).
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Media {
    pub fn sized(width: f64, height: f64) -> Self {
        Self {
            width: Some(MediaValue::Number(width)),
            height: Some(MediaValue::Number(height)),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width.is_none()
            && self.height.is_none()
            && self.duration.is_none()
            && self.autoplay.is_none()
            && self.extra.is_empty()
    }

    pub fn has_size(&self) -> bool {
        self.width.is_some() && self.height.is_some()
    }

    /// Deep-merge `other` into this record. Values present in `other`
    /// override ours; nested objects in `extra` are merged key by key with
    /// the same rule. Absent or null values in `other` never erase ours.
    pub fn merge_from(&mut self, other: &Media) {
        if other.width.is_some() {
            self.width.clone_from(&other.width);
        }
        if other.height.is_some() {
            self.height.clone_from(&other.height);
        }
        if other.duration.is_some() {
            self.duration.clone_from(&other.duration);
        }
        if other.autoplay.is_some() {
            self.autoplay.clone_from(&other.autoplay);
        }
        merge_maps(&mut self.extra, &other.extra);
    }
}

fn merge_maps(base: &mut Map<String, JsonValue>, other: &Map<String, JsonValue>) {
    for (key, value) in other {
        if value.is_null() {
            base.entry(key.clone()).or_insert(JsonValue::Null);
            continue;
        }

        if let (Some(JsonValue::Object(existing)), JsonValue::Object(incoming)) =
            (base.get_mut(key), value)
        {
            merge_maps(existing, incoming);
            continue;
        }

        base.insert(key.clone(), value.clone());
    }
}

/// Pixel (or other unit) size of an image resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: f64,
    pub height: f64,
    #[serde(rename = "wUnits")]
    pub width_units: String,
    #[serde(rename = "hUnits")]
    pub height_units: String,
    /// Detected MIME type, when known.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ImageDimensions {
    pub fn px(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            width_units: "px".to_string(),
            height_units: "px".to_string(),
            mime_type: None,
        }
    }

    pub fn is_pixels(&self) -> bool {
        self.width_units == "px" && self.height_units == "px"
    }
}
