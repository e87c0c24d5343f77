//! Turkish-aware case folding shared by headwords and queries.

/// Lowercases `text` with Turkish dotted/dotless `i` rules.
///
/// `İ` becomes `i`, ASCII `I` becomes `ı`, and everything else goes through
/// the standard Unicode lowercase mapping. The result is stable under a second
/// application.
pub fn normalize(text: &str) -> String {
    text.replace('İ', "i").replace('I', "ı").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn dotted_and_dotless_capitals() {
        assert_eq!(normalize("İSTANBUL"), "istanbul");
        assert_eq!(normalize("IRMAK"), "ırmak");
        assert_eq!(normalize("Işık"), "ışık");
    }

    #[test]
    fn plain_lowercase_is_untouched() {
        assert_eq!(normalize("kitap"), "kitap");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn other_letters_use_standard_folding() {
        assert_eq!(normalize("ÇĞÖŞÜ"), "çğöşü");
        assert_eq!(normalize("KİTAP"), "kitap");
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(text in "\\PC*") {
            let once = normalize(&text);
            prop_assert_eq!(normalize(&once), once);
        }
    }
}
