//! Cache key derivation for free-form location strings.
//!
//! A US ZIP code anywhere in the location wins; otherwise the whole location
//! is folded to an ASCII slug. Two spellings of one place are not guaranteed
//! to collide.

use std::fmt;

/// Prefix shared by every forecast cache key
pub const CACHE_KEY_PREFIX: &str = "weather_forecast_";

const SLUG_SEPARATOR: char = '_';

/// Canonical identity of one forecast cache entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a location. Never fails; `None` and `""` map to the bare prefix.
    pub fn derive(location: Option<&str>) -> Self {
        let location = location.unwrap_or_default();
        let suffix = match extract_zip_code(location) {
            Some(zip) => zip.to_string(),
            None => slugify(location),
        };
        Self(format!("{}{}", CACHE_KEY_PREFIX, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Find the first US ZIP code (`12345` or `12345-6789`) in `location`.
///
/// The code must be a whole digit run: `123456` holds no ZIP, while
/// `abc10001xyz` holds `10001`. A `+4` suffix is only taken when it is
/// itself exactly four digits.
pub fn extract_zip_code(location: &str) -> Option<&str> {
    let bytes = location.as_bytes();
    let digit_run_end = |from: usize| {
        bytes[from..]
            .iter()
            .position(|b| !b.is_ascii_digit())
            .map_or(bytes.len(), |offset| from + offset)
    };

    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }

        let start = i;
        i = digit_run_end(start);
        if i - start != 5 {
            continue;
        }

        if bytes.get(i) == Some(&b'-') && digit_run_end(i + 1) == i + 5 {
            return Some(&location[start..i + 5]);
        }
        return Some(&location[start..i]);
    }

    None
}

/// Lowercase ASCII slug: accents folded, every run of other characters
/// collapsed to a single `_`, no leading or trailing separator.
pub fn slugify(text: &str) -> String {
    let ascii = deunicode::deunicode(text);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_separator = false;

    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push(SLUG_SEPARATOR);
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}
