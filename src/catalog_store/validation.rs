//! Validation for candidate catalog records.
//!
//! Runs before anything touches the database, so a rejected record never
//! opens a transaction.

use super::models::{NewAlbum, NewOrder, NewSong};
use std::fmt;

/// Validation error types
#[derive(Debug, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField { field: &'static str },
    NonPositiveValue { field: &'static str, value: i64 },
    NegativeValue { field: &'static str, value: i64 },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField { field } => {
                write!(f, "Field '{}' is required but was empty", field)
            }
            ValidationError::NonPositiveValue { field, value } => {
                write!(f, "Field '{}' must be positive, got {}", field, value)
            }
            ValidationError::NegativeValue { field, value } => {
                write!(f, "Field '{}' must be non-negative, got {}", field, value)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

fn require_text(field: &'static str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(())
}

pub fn validate_new_album(album: &NewAlbum) -> ValidationResult<()> {
    require_text("title", &album.title)?;
    require_text("artist", &album.artist)?;
    if album.price.cents() < 0 {
        return Err(ValidationError::NegativeValue {
            field: "price",
            value: album.price.cents(),
        });
    }
    if album.quantity < 0 {
        return Err(ValidationError::NegativeValue {
            field: "quantity",
            value: album.quantity,
        });
    }
    Ok(())
}

pub fn validate_new_song(song: &NewSong) -> ValidationResult<()> {
    require_text("name", &song.name)
}

pub fn validate_order_request(
    album_title: &str,
    quantity: u32,
    entry: &NewOrder,
) -> ValidationResult<()> {
    require_text("album_title", album_title)?;
    if quantity == 0 {
        return Err(ValidationError::NonPositiveValue {
            field: "quantity",
            value: 0,
        });
    }
    require_text("customer", &entry.customer)
}
