//! Identifier normalization helpers

/// Trim and lower-case
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Text before the first `@`, or the whole identifier when there is none
pub fn local_part(identifier: &str) -> &str {
    identifier
        .split_once('@')
        .map_or(identifier, |(local, _)| local)
}

/// Normalized local part of a raw identifier
pub fn normalized_local_part(raw: &str) -> String {
    normalize_identifier(local_part(raw.trim()))
}

/// Drop everything that is not a letter
pub fn alphabetic_only(value: &str) -> String {
    value.chars().filter(|c| c.is_alphabetic()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("  Budi.Santoso@School.ID "), "budi.santoso@school.id");
    }

    #[test]
    fn test_local_part() {
        assert_eq!(local_part("adi.sasmito.s.pd@domain"), "adi.sasmito.s.pd");
        assert_eq!(local_part("7A"), "7A");
        assert_eq!(local_part("@domain"), "");
    }

    #[test]
    fn test_normalized_local_part_trims_before_split() {
        assert_eq!(normalized_local_part("  AdiSasmito@Domain"), "adisasmito");
    }

    #[test]
    fn test_alphabetic_only() {
        assert_eq!(alphabetic_only("adi.sasmito.s_pd2"), "adisasmitospd");
        assert_eq!(alphabetic_only("123._"), "");
    }
}
