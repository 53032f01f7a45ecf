//! PDF version to `compatibility` option mapping

/// Lowest PDF version (times ten) a document can be created with.
pub const MIN_PDF_VERSION: u32 = 14;

/// Clamp a raw version (PDF 1.7 is `17`) to `minimum` and render it the way
/// the engine's `compatibility` option expects it, e.g. `"1.7"`.
pub fn compatibility(version: u32, minimum: u32) -> String {
    let version = version.max(minimum);
    format!("{:.1}", f64::from(version) / 10.0)
}

/// The option list fragment selecting `version`.
pub fn compatibility_option(version: u32, minimum: u32) -> String {
    format!("compatibility={}", compatibility(version, minimum))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_map_to_compatibility_strings() {
        let expected = [
            (9, "1.4"),
            (10, "1.4"),
            (11, "1.4"),
            (12, "1.4"),
            (13, "1.4"),
            (14, "1.4"),
            (15, "1.5"),
            (16, "1.6"),
            (17, "1.7"),
            (18, "1.8"),
            (19, "1.9"),
            (20, "2.0"),
        ];
        for (raw, compat) in expected {
            assert_eq!(compatibility(raw, MIN_PDF_VERSION), compat, "raw version {raw}");
        }
    }

    #[test]
    fn test_custom_minimum() {
        assert_eq!(compatibility(14, 16), "1.6");
        assert_eq!(compatibility_option(17, 16), "compatibility=1.7");
    }
}
