//! Submitted form bodies and their validation rules.

use serde::Deserialize;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::db::users;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("{0} is required.")]
    Required(&'static str),
    #[error("Enter a valid username. It may contain only letters, numbers, and @/./+/-/_ characters.")]
    InvalidUsername,
    #[error("Ensure the username has at most 150 characters.")]
    UsernameTooLong,
    #[error("Enter a valid email address.")]
    InvalidEmail,
    #[error("A user with that username already exists.")]
    UsernameTaken,
    #[error("A user with that email already exists.")]
    EmailTaken,
    #[error("The two password fields didn't match.")]
    PasswordMismatch,
    #[error("This password is too short. It must contain at least 8 characters.")]
    PasswordTooShort,
    #[error("This password is entirely numeric.")]
    PasswordNumeric,
    #[error("Upload a valid image (png, jpg, gif or webp).")]
    InvalidAvatar,
}

pub type Errors = Vec<FormError>;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub return_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

impl RegisterForm {
    /// Trims and lowercases the identity fields, then checks every rule that
    /// doesn't need the database.
    pub fn clean(mut self) -> Result<RegisterForm, (RegisterForm, Errors)> {
        self.name = self.name.trim().to_owned();
        self.username = self.username.trim().to_lowercase();
        self.email = self.email.trim().to_lowercase();

        let mut errors = identity_errors(&self.name, &self.username, &self.email);

        if self.password1 != self.password2 {
            errors.push(FormError::PasswordMismatch);
        }
        if self.password1.chars().count() < 8 {
            errors.push(FormError::PasswordTooShort);
        }
        if !self.password1.is_empty() && self.password1.chars().all(|c| c.is_ascii_digit()) {
            errors.push(FormError::PasswordNumeric);
        }

        if errors.is_empty() { Ok(self) } else { Err((self, errors)) }
    }
}

/// The text fields of the profile form; the avatar arrives separately.
#[derive(Debug, Default)]
pub struct ProfileForm {
    pub name: String,
    pub username: String,
    pub email: String,
    pub bio: String,
}

impl ProfileForm {
    pub fn clean(mut self) -> Result<ProfileForm, (ProfileForm, Errors)> {
        self.name = self.name.trim().to_owned();
        self.username = self.username.trim().to_lowercase();
        self.email = self.email.trim().to_lowercase();
        self.bio = self.bio.trim().to_owned();

        let errors = identity_errors(&self.name, &self.username, &self.email);
        if errors.is_empty() { Ok(self) } else { Err((self, errors)) }
    }

    pub fn bio(&self) -> Option<&str> {
        non_empty(&self.bio)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RoomForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub description: String,
}

impl RoomForm {
    pub fn clean(mut self) -> Result<RoomForm, (RoomForm, Errors)> {
        self.name = self.name.trim().to_owned();
        self.topic = self.topic.trim().to_owned();
        self.description = self.description.trim().to_owned();

        let mut errors = Vec::new();
        if self.name.is_empty() {
            errors.push(FormError::Required("Room name"));
        }
        if self.topic.is_empty() {
            errors.push(FormError::Required("Topic"));
        }

        if errors.is_empty() { Ok(self) } else { Err((self, errors)) }
    }

    pub fn description(&self) -> Option<&str> {
        non_empty(&self.description)
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageForm {
    #[serde(default)]
    pub body: String,
}

/// Username/email uniqueness, ignoring the user being edited.
pub async fn unique_errors(
    db_pool: &SqlitePool,
    username: &str,
    email: &str,
    except: Option<Uuid>,
) -> sqlx::Result<Errors> {
    let mut errors = Vec::new();
    if users::username_taken(db_pool, username, except).await? {
        errors.push(FormError::UsernameTaken);
    }
    if users::email_taken(db_pool, email, except).await? {
        errors.push(FormError::EmailTaken);
    }
    Ok(errors)
}

/// Checks an upload is really an image of the kind its name says and
/// returns the extension to store it under. Decodes the whole file, so
/// keep it off the async workers.
pub fn avatar_format(file_name: &str, data: &[u8]) -> Result<&'static str, FormError> {
    let ext = avatar_extension(file_name)?;

    let format = image::guess_format(data).map_err(|_| FormError::InvalidAvatar)?;
    if !format.extensions_str().contains(&ext) {
        return Err(FormError::InvalidAvatar);
    }
    image::load_from_memory_with_format(data, format).map_err(|_| FormError::InvalidAvatar)?;

    Ok(ext)
}

/// Extension to store an uploaded avatar under, judged by its file name.
fn avatar_extension(file_name: &str) -> Result<&'static str, FormError> {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .ok_or(FormError::InvalidAvatar)?;

    match ext.as_str() {
        "png" => Ok("png"),
        "jpg" | "jpeg" => Ok("jpg"),
        "gif" => Ok("gif"),
        "webp" => Ok("webp"),
        _ => Err(FormError::InvalidAvatar),
    }
}

fn identity_errors(name: &str, username: &str, email: &str) -> Errors {
    let mut errors = Vec::new();

    if name.is_empty() {
        errors.push(FormError::Required("Name"));
    }

    if username.is_empty() {
        errors.push(FormError::Required("Username"));
    } else if username.chars().count() > 150 {
        errors.push(FormError::UsernameTooLong);
    } else if !username.chars().all(|c| c.is_alphanumeric() || "@.+-_".contains(c)) {
        errors.push(FormError::InvalidUsername);
    }

    if email.is_empty() {
        errors.push(FormError::Required("Email"));
    } else if !looks_like_email(email) {
        errors.push(FormError::InvalidEmail);
    }

    errors
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn non_empty(text: &str) -> Option<&str> {
    if text.is_empty() { None } else { Some(text) }
}
