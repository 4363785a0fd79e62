//! Mutation drafts
//!
//! A draft is the single canonical object behind one add/update. It is
//! validated before submission and dropped once the write settles.

use thiserror::Error;

/// Minimum length of link fields
const MIN_FIELD_LEN: usize = 3;
/// Hub title bounds
const HUB_TITLE_LEN: (usize, usize) = (3, 20);
/// Hub description bounds
const HUB_DESCRIPTION_LEN: (usize, usize) = (3, 200);
/// Length of a CIDv0 content reference
const CID_V0_LEN: usize = 46;

/// Validation failures for drafts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be at least {min} characters long")]
    TooShort { field: &'static str, min: usize },

    #[error("{field} must be at most {max} characters long")]
    TooLong { field: &'static str, max: usize },

    #[error("Image reference '{0}' is not a valid content hash")]
    InvalidImageRef(String),
}

/// What to do with the image of the edited entity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageInput {
    /// Keep the current reference (if any)
    #[default]
    Keep,
    /// Use an already uploaded reference
    Reference(String),
    /// Remove the image
    Clear,
    /// Upload these bytes and use the resulting reference
    Upload(Vec<u8>),
}

impl ImageInput {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            ImageInput::Reference(r) => validate_image_ref(r),
            ImageInput::Upload(bytes) if bytes.is_empty() => {
                Err(ValidationError::Required { field: "Image" })
            }
            _ => Ok(()),
        }
    }
}

/// Draft for adding or editing a link
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkDraft {
    pub uri: String,
    pub title: String,
    pub description: String,
    pub image: ImageInput,
}

impl LinkDraft {
    pub fn new(
        uri: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            title: title.into(),
            description: description.into(),
            image: ImageInput::Keep,
        }
    }

    pub fn with_image(mut self, image: ImageInput) -> Self {
        self.image = image;
        self
    }

    /// Validate and normalize (trim) the draft
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.uri = check_min("Uri", &self.uri, MIN_FIELD_LEN)?;
        self.title = check_min("Title", &self.title, MIN_FIELD_LEN)?;
        self.description = check_min("Description", &self.description, MIN_FIELD_LEN)?;
        self.image.validate()?;
        Ok(self)
    }
}

/// Draft for creating or editing a hub
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubDraft {
    pub title: String,
    pub description: String,
    pub image: ImageInput,
}

impl HubDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            image: ImageInput::Keep,
        }
    }

    pub fn with_image(mut self, image: ImageInput) -> Self {
        self.image = image;
        self
    }

    /// Validate and normalize (trim) the draft
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.title = check_range("Title", &self.title, HUB_TITLE_LEN)?;
        self.description = check_range("Description", &self.description, HUB_DESCRIPTION_LEN)?;
        self.image.validate()?;
        Ok(self)
    }
}

/// Check that a reference looks like a CIDv0 hash (`Qm` + base58)
pub fn validate_image_ref(reference: &str) -> Result<(), ValidationError> {
    let valid = reference.len() == CID_V0_LEN
        && reference.starts_with("Qm")
        && reference
            .chars()
            .all(|c| c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l'));

    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidImageRef(reference.to_string()))
    }
}

fn check_min(field: &'static str, value: &str, min: usize) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required { field });
    }
    if value.chars().count() < min {
        return Err(ValidationError::TooShort { field, min });
    }
    Ok(value.to_string())
}

fn check_range(
    field: &'static str,
    value: &str,
    (min, max): (usize, usize),
) -> Result<String, ValidationError> {
    let value = check_min(field, value, min)?;
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(value)
}
