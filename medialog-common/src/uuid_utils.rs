//! UUID utilities

use uuid::Uuid;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse UUID from string
pub fn parse(s: &str) -> Result<Uuid, uuid::Error> {
    Uuid::parse_str(s)
}

/// Parse an optional UUID column, treating an empty string as absent
pub fn parse_optional(s: Option<&str>) -> Result<Option<Uuid>, uuid::Error> {
    match s {
        None | Some("") => Ok(None),
        Some(value) => Uuid::parse_str(value).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_optional_empty_is_none() {
        assert_eq!(parse_optional(None).unwrap(), None);
        assert_eq!(parse_optional(Some("")).unwrap(), None);
    }

    #[test]
    fn test_parse_optional_round_trip() {
        let id = generate();
        assert_eq!(parse_optional(Some(&id.to_string())).unwrap(), Some(id));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse("not-a-uuid").is_err());
    }
}
