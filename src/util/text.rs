//! Text helpers for URL slugs and SKU construction.
//!
//! Slugs are derived deterministically and NOT pre-checked for uniqueness;
//! the unique column constraint is the source of truth and its violation is
//! surfaced as a retryable conflict by the write paths.

/// Lowercase a display name and collapse whitespace runs into single hyphens.
pub fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Uppercase, spaces to hyphens, then strip everything that is not
/// ASCII alphanumeric or a hyphen.
pub fn sku_sanitize(part: &str) -> String {
    part.to_uppercase()
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect()
}

/// Deterministic SKU base: brand name when present, else product name,
/// truncated to 10 characters before sanitizing; an optional size segment
/// is sanitized and appended with a hyphen.
pub fn sku_base(product_name: &str, size: &str, brand: &str) -> String {
    let source = if brand.trim().is_empty() {
        product_name
    } else {
        brand
    };
    let prefix: String = source.chars().take(10).collect();
    let head = sku_sanitize(&prefix);
    if size.trim().is_empty() {
        head
    } else {
        format!("{}-{}", head, sku_sanitize(size))
    }
}

/// Candidate for the nth collision-breaking probe: the base itself for
/// attempt 0, then `base-1`, `base-2`, ...
pub fn suffixed(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_whitespace_and_lowercases() {
        assert_eq!(slugify("  Bosch  Filter\tX "), "bosch-filter-x");
        assert_eq!(slugify("Plain"), "plain");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn sku_sanitize_strips_punctuation() {
        assert_eq!(sku_sanitize("Bosch Pro!"), "BOSCH-PRO");
        assert_eq!(sku_sanitize("a/b.c"), "ABC");
    }

    #[test]
    fn sku_base_prefers_brand_and_truncates() {
        assert_eq!(sku_base("Bosch", "60", "Bosch"), "BOSCH-60");
        // truncation happens before sanitizing, like the admin form expects
        assert_eq!(sku_base("Very Long Product Name", "", ""), "VERY-LONG-");
        assert_eq!(sku_base("abcdefghijk", "", ""), "ABCDEFGHIJ");
    }

    #[test]
    fn suffixed_probes_advance() {
        assert_eq!(suffixed("BOSCH-60", 0), "BOSCH-60");
        assert_eq!(suffixed("BOSCH-60", 2), "BOSCH-60-2");
    }
}
