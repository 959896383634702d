//! Validation and binding of submitted form data.
//!
//! A form either cleans into a typed value or produces [`FormErrors`] keyed
//! by field name; nothing is persisted until a form has cleaned.

use bytes::Bytes;
use image::ImageFormat;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::domain::group::Group;

/// Key for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "__all__";

const REQUIRED: &str = "This field is required.";
const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
const EMPTY_FILE: &str = "The submitted file is empty.";
const INVALID_USERNAME: &str = "Enter a valid username. This value may contain only letters, \
     numbers, and @/./+/-/_ characters.";
const RESERVED_USERNAME: &str = "This username is reserved.";
const INVALID_EMAIL: &str = "Enter a valid email address.";
const PASSWORD_TOO_SHORT: &str =
    "This password is too short. It must contain at least 8 characters.";
const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";

const MAX_USERNAME_LEN: usize = 150;
const MAX_PASSWORD_LEN: usize = 128;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_DISPLAY_NAME_LEN: usize = 150;

/// Usernames that would shadow a top-level route.
const RESERVED_USERNAMES: &[&str] = &["about", "admin", "auth", "follow", "group", "health", "new"];

/// Contents of a submitted file. The client's file name and content type are
/// not trusted; the format is sniffed from the bytes.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub data: Bytes,
}

/// Raw submitted fields and files, as decoded from the request body.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, UploadedFile>,
}

impl FormData {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Trimmed value, `None` when missing or blank.
    pub fn cleaned(&self, name: &str) -> Option<String> {
        self.field(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    pub fn checkbox(&self, name: &str) -> bool {
        matches!(self.field(name), Some("on" | "true" | "1"))
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

/// A form as handed to the client: current values plus field errors.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BoundForm {
    pub data: BTreeMap<String, String>,
    pub errors: FormErrors,
}

impl BoundForm {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn initial<'a>(values: impl IntoIterator<Item = (&'a str, String)>) -> Self {
        Self {
            data: values
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
            errors: FormErrors::default(),
        }
    }

    /// Echoes the submitted values of `fields` back next to `errors`.
    pub fn invalid(submitted: &FormData, fields: &[&str], errors: FormErrors) -> Self {
        let data = fields
            .iter()
            .filter_map(|name| {
                submitted
                    .field(name)
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect();
        Self { data, errors }
    }
}

#[derive(Debug, Clone)]
pub struct ValidImage {
    pub data: Bytes,
    pub extension: &'static str,
    pub content_type: &'static str,
}

#[derive(Debug, Clone)]
pub enum ImageChange {
    Keep,
    Clear,
    Replace(ValidImage),
}

#[derive(Debug, Clone)]
pub struct PostForm {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: ImageChange,
}

impl PostForm {
    pub const FIELDS: &'static [&'static str] = &["text", "group"];

    /// `groups` are the valid choices for the `group` field.
    pub fn clean(data: &FormData, groups: &[Group]) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::default();

        let text = data.cleaned("text");
        if text.is_none() {
            errors.add("text", REQUIRED);
        }

        let group_id = match data.cleaned("group") {
            None => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) if groups.iter().any(|group| group.id == id) => Some(id),
                _ => {
                    errors.add("group", INVALID_CHOICE);
                    None
                }
            },
        };

        let image = match data.file("image") {
            Some(file) => match validate_image(file) {
                Ok(image) => ImageChange::Replace(image),
                Err(message) => {
                    errors.add("image", message);
                    ImageChange::Keep
                }
            },
            None if data.checkbox("image-clear") => ImageChange::Clear,
            None => ImageChange::Keep,
        };

        errors.finish(|| Self {
            text: text.unwrap_or_default(),
            group_id,
            image,
        })
    }
}

pub fn validate_image(file: &UploadedFile) -> Result<ValidImage, &'static str> {
    if file.data.is_empty() {
        return Err(EMPTY_FILE);
    }

    let format = image::guess_format(&file.data).map_err(|_| INVALID_IMAGE)?;
    let (extension, content_type) = match format {
        ImageFormat::Gif => ("gif", "image/gif"),
        ImageFormat::Jpeg => ("jpg", "image/jpeg"),
        ImageFormat::Png => ("png", "image/png"),
        ImageFormat::WebP => ("webp", "image/webp"),
        _ => return Err(INVALID_IMAGE),
    };
    image::load_from_memory_with_format(&file.data, format).map_err(|_| INVALID_IMAGE)?;

    Ok(ValidImage {
        data: file.data.clone(),
        extension,
        content_type,
    })
}

#[derive(Debug, Clone)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub const FIELDS: &'static [&'static str] = &["text"];

    pub fn clean(data: &FormData) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::default();
        let text = data.cleaned("text");
        if text.is_none() {
            errors.add("text", REQUIRED);
        }
        errors.finish(|| Self {
            text: text.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub password: String,
}

impl SignupForm {
    /// Password fields are never echoed back.
    pub const FIELDS: &'static [&'static str] = &["username", "email", "display_name"];

    pub fn clean(data: &FormData) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::default();

        let username = data.cleaned("username");
        match &username {
            None => errors.add("username", REQUIRED),
            Some(name) if !is_valid_username(name) => errors.add("username", INVALID_USERNAME),
            Some(name) if RESERVED_USERNAMES.contains(&name.to_lowercase().as_str()) => {
                errors.add("username", RESERVED_USERNAME)
            }
            Some(_) => {}
        }

        let email = data.cleaned("email");
        match &email {
            None => errors.add("email", REQUIRED),
            Some(email) if !is_valid_email(email) => errors.add("email", INVALID_EMAIL),
            Some(_) => {}
        }

        let display_name = data.cleaned("display_name").unwrap_or_default();
        if display_name.chars().count() > MAX_DISPLAY_NAME_LEN {
            errors.add(
                "display_name",
                format!(
                    "Ensure this value has at most {} characters.",
                    MAX_DISPLAY_NAME_LEN
                ),
            );
        }

        let password1 = data.field("password1").unwrap_or_default();
        let password2 = data.field("password2").unwrap_or_default();
        if password1.is_empty() {
            errors.add("password1", REQUIRED);
        } else if password1.chars().count() < MIN_PASSWORD_LEN {
            errors.add("password1", PASSWORD_TOO_SHORT);
        } else if password1.len() > MAX_PASSWORD_LEN {
            errors.add(
                "password1",
                format!(
                    "Ensure this value has at most {} characters.",
                    MAX_PASSWORD_LEN
                ),
            );
        }
        if password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if !password1.is_empty() && password1 != password2 {
            errors.add("password2", PASSWORD_MISMATCH);
        }

        errors.finish(|| Self {
            username: username.unwrap_or_default(),
            email: email.unwrap_or_default(),
            display_name,
            password: password1.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub const FIELDS: &'static [&'static str] = &["username"];

    pub fn clean(data: &FormData) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::default();
        let username = data.cleaned("username");
        if username.is_none() {
            errors.add("username", REQUIRED);
        }
        let password = data.field("password").unwrap_or_default();
        if password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.finish(|| Self {
            username: username.unwrap_or_default(),
            password: password.to_string(),
        })
    }
}

fn is_valid_username(username: &str) -> bool {
    username.chars().count() <= MAX_USERNAME_LEN
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.rsplit_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
        }
        None => false,
    }
}
