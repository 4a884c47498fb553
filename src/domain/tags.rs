use super::ports::TagSource;
use thiserror::Error;

pub const PREDEFINED_TAGS: [&str; 8] = [
    "Food",
    "Transport",
    "Utilities",
    "Entertainment",
    "Shopping",
    "Health",
    "Education",
    "Other",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    #[error("Tag name cannot be empty")]
    Empty,
    #[error("Tag `{0}` already exists")]
    Duplicate(String),
    #[error("No custom tag at position {0}")]
    NotFound(usize),
    #[error("No custom tag named `{0}`")]
    Unknown(String),
}

/// Predefined tags followed by the user's own.
#[derive(Debug, Clone, Default)]
pub struct TagCatalog {
    custom: Vec<String>,
}

impl TagCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from stored custom tags, skipping blanks and duplicates.
    pub fn with_custom<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut catalog = Self::new();
        for tag in tags {
            if let Err(e) = catalog.add_custom(tag.as_ref()) {
                tracing::warn!("ignoring stored custom tag: {}", e);
            }
        }
        catalog
    }

    pub fn custom(&self) -> &[String] {
        &self.custom
    }

    pub fn contains(&self, tag: &str) -> bool {
        PREDEFINED_TAGS.contains(&tag) || self.custom.iter().any(|t| t == tag)
    }

    pub fn add_custom(&mut self, name: &str) -> Result<(), TagError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TagError::Empty);
        }
        if self.contains(name) {
            return Err(TagError::Duplicate(name.to_string()));
        }
        self.custom.push(name.to_string());
        Ok(())
    }

    pub fn rename_custom(&mut self, index: usize, name: &str) -> Result<(), TagError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TagError::Empty);
        }
        let current = self.custom.get(index).ok_or(TagError::NotFound(index))?;
        if current != name && self.contains(name) {
            return Err(TagError::Duplicate(name.to_string()));
        }
        self.custom[index] = name.to_string();
        Ok(())
    }

    pub fn remove_custom(&mut self, index: usize) -> Result<String, TagError> {
        if index >= self.custom.len() {
            return Err(TagError::NotFound(index));
        }
        Ok(self.custom.remove(index))
    }
}

impl TagSource for TagCatalog {
    fn tags(&self) -> Vec<String> {
        PREDEFINED_TAGS
            .iter()
            .map(|t| t.to_string())
            .chain(self.custom.iter().cloned())
            .collect()
    }
}
