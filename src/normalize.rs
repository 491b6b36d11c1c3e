/// Canonical comparison form: trimmed, lowercased, typographic dashes as `-`.
pub fn normalize(s: Option<&str>) -> String {
    s.unwrap_or_default()
        .trim()
        .to_lowercase()
        .replace(['–', '—'], "-")
}

/// Normalized substring check, both sides normalized.
pub fn contains_normalized(haystack: &str, needle: &str) -> bool {
    normalize(Some(haystack)).contains(&normalize(Some(needle)))
}

/// First letters of each word, e.g. "Registered Nurse" -> "rn".
pub fn initials(s: &str) -> String {
    normalize(Some(s))
        .split(|c: char| !c.is_alphanumeric())
        .filter_map(|word| word.chars().next())
        .collect()
}
