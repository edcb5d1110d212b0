//! Model card: static metadata identifying an endpoint.

use serde::{Deserialize, Serialize};

/// Endpoint identity shown by the host.
///
/// Built once per endpoint definition and serialized verbatim into the
/// metadata document. Text fields are trimmed and tags deduplicated on
/// construction, so two cards describing the same endpoint compare equal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCard {
    pub name: String,

    pub description: String,

    pub author: String,

    /// Tags in first-seen order, without duplicates
    #[serde(default)]
    pub tags: Vec<String>,

    /// Sample rate the model expects, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ModelCard {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            author: author.into(),
            tags: Vec::new(),
            sample_rate: None,
            version: None,
        }
        .canonicalize()
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self.canonicalize()
    }

    pub fn tag(self, tag: impl Into<String>) -> Self {
        self.tags([tag])
    }

    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into().trim().to_string());
        self
    }

    /// Trim text fields and deduplicate tags, keeping first-seen order.
    ///
    /// Idempotent. Applied by every constructor and setter; call it directly
    /// on cards obtained through deserialization.
    pub fn canonicalize(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.description = self.description.trim().to_string();
        self.author = self.author.trim().to_string();

        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in self.tags.drain(..) {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
        self.tags = tags;
        self
    }
}
