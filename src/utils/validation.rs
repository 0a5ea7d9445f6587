use regex::Regex;
use std::sync::LazyLock;
use crate::error::{AppError, AppResult};

static SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap());
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Slugs that would shadow fixed routes
const RESERVED_SLUGS: &[&str] = &["api", "static", "admin", "dashboard", "swagger-ui", "display"];

pub fn validate_slug(slug: &str) -> AppResult<()> {
    if slug.len() < 3 || slug.len() > 64 {
        return Err(AppError::ValidationError(
            "Slug must be between 3 and 64 characters".to_string(),
        ));
    }
    if !SLUG.is_match(slug) {
        return Err(AppError::ValidationError(
            "Slug may only contain lowercase letters, digits and single dashes".to_string(),
        ));
    }
    if RESERVED_SLUGS.contains(&slug) {
        return Err(AppError::ValidationError("Slug is reserved".to_string()));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> AppResult<()> {
    if email.len() > 120 || !EMAIL.is_match(email) {
        return Err(AppError::ValidationError("Invalid email address".to_string()));
    }
    Ok(())
}

/// Trims and turns blank input into None.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("barbershop-andi").is_ok());
        assert!(validate_slug("warung99").is_ok());
        assert!(validate_slug("ab").is_err());
        assert!(validate_slug("Barbershop").is_err());
        assert!(validate_slug("double--dash").is_err());
        assert!(validate_slug("-leading").is_err());
        assert!(validate_slug("api").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("andi@example.com").is_ok());
        assert!(validate_email("andi@example").is_err());
        assert!(validate_email("andi example.com").is_err());
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  Budi ")), Some("Budi".to_string()));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
