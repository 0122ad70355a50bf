//! Script normalization applied before matching.
//!
//! Search engines freely mix traditional and simplified renderings of the same sentence, so both
//! sides of a comparison are folded to simplified script (via `zhconv`) first. The result is
//! only used for scoring, never for display.

use zhconv::{zhconv, Variant};

/// Traditional -> simplified Chinese. Non-CJK text passes through unchanged.
pub fn to_simplified(s: &str) -> String {
    if s.is_ascii() {
        return s.to_string();
    }
    zhconv(s, Variant::ZhHans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_traditional_characters() {
        assert_eq!(to_simplified("這是測試文本"), "这是测试文本");
    }

    #[test]
    fn simplified_text_is_a_fixed_point() {
        let s = "这是测试文本";
        assert_eq!(to_simplified(s), s);
        assert_eq!(to_simplified(&to_simplified("這是測試")), to_simplified("這是測試"));
    }

    #[test]
    fn ascii_passes_through() {
        assert_eq!(to_simplified("Hello, world 42"), "Hello, world 42");
        assert_eq!(to_simplified(""), "");
    }
}
