//! Submitted post and comment forms, and their validation.
//!
//! Validation never mutates anything. A failed form comes back as
//! [`FormErrors`] so the caller can redisplay it next to the submitted values.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{entity::prelude::*, ids::GroupId};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_IMAGE: &str = "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Field name -> messages. Serializes as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    fn into_result<T>(self, ok: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(ok)
        } else {
            Err(self)
        }
    }
}

/// Decodes the whole upload and returns its width and height. A known
/// header followed by a broken or truncated body is an error.
pub fn image_dimensions(data: &[u8]) -> Result<(u32, u32), image::ImageError> {
    let img = image::load_from_memory(data)?;
    Ok((img.width(), img.height()))
}

/// A file as received from a multipart submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub filename: String,
    pub data: Bytes,
}

/// Raw post form, as submitted. Any `author` field is never read: the
/// author is always the requester.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub text: String,
    pub group: Option<String>,
    pub image: Option<Upload>,
}

#[derive(Debug, Clone)]
pub struct CleanedPostForm {
    pub text: String,
    pub group: Option<GroupId>,
    pub image: Option<Upload>,
}

impl PostForm {
    pub async fn clean<C: ConnectionTrait>(
        &self,
        db: &C,
    ) -> Result<Result<CleanedPostForm, FormErrors>, DbErr> {
        let mut errors = FormErrors::default();

        if self.text.trim().is_empty() {
            errors.add("text", REQUIRED);
        }

        let group = match self.group.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let found = match raw.parse::<GroupId>() {
                    Ok(id) => Group::find_by_id(id).one(db).await?.map(|group| group.id),
                    Err(_) => None,
                };
                if found.is_none() {
                    errors.add("group", INVALID_CHOICE);
                }
                found
            }
        };

        // An empty file part is how browsers send "no file chosen".
        let image = self.image.clone().filter(|upload| !upload.data.is_empty());
        if let Some(upload) = &image {
            if let Err(e) = image_dimensions(&upload.data) {
                tracing::debug!(filename = %upload.filename, error = %e, "image rejected");
                errors.add("image", INVALID_IMAGE);
            }
        }

        Ok(errors.into_result(CleanedPostForm {
            text: self.text.trim().to_string(),
            group,
            image,
        }))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

impl CommentForm {
    pub fn clean(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::default();
        if self.text.trim().is_empty() {
            errors.add("text", REQUIRED);
        }
        errors.into_result(self.text.trim().to_string())
    }
}
