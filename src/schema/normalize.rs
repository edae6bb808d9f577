//! Disease-key normalization
//!
//! Display names such as `"Đau nửa đầu (Migraine)"` become join keys such as
//! `dau_nua_dau_migraine`: lowercase ASCII, Vietnamese diacritics folded to
//! their base letter, whitespace runs replaced by `_`, everything else outside
//! `[a-z0-9_]` dropped.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Base letter for each group of accented lowercase Vietnamese letters
const FOLD_TABLE: &[(&str, char)] = &[
    ("áàảãạăắằẳẵặâấầẩẫậ", 'a'),
    ("đ", 'd'),
    ("éèẻẽẹêếềểễệ", 'e'),
    ("íìỉĩị", 'i'),
    ("óòỏõọôốồổỗộơớờởỡợ", 'o'),
    ("úùủũụưứừửữự", 'u'),
    ("ýỳỷỹỵ", 'y'),
];

/// Fold one lowercase character to its unaccented base letter
#[must_use]
pub fn fold_diacritic(c: char) -> char {
    if c.is_ascii() {
        return c;
    }
    FOLD_TABLE
        .iter()
        .find(|(group, _)| group.contains(c))
        .map_or(c, |&(_, base)| base)
}

/// Lowercase `text` and strip Vietnamese diacritics (`đ` becomes `d`)
#[must_use]
pub fn remove_diacritics(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(fold_diacritic)
        .collect()
}

/// Normalize a display name into a disease (or feature) key
#[must_use]
pub fn normalize_key(text: &str) -> String {
    let folded = remove_diacritics(text.trim());
    WHITESPACE
        .replace_all(&folded, "_")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect()
}
