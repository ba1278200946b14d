// src/index/locale.rs
//! BCP 47 tag canonicalization for the `locale` server variable.

/// Fallback for tags that cannot be parsed.
pub const ROOT_LOCALE: &str = "root-AQ";

/// Canonical casing of a well-formed language tag (`en_us` → `en-US`,
/// `zh-hant-tw` → `zh-Hant-TW`); malformed input yields [`ROOT_LOCALE`].
pub fn canonical_locale(raw: &str) -> String {
    canonicalize(raw.trim()).unwrap_or_else(|| ROOT_LOCALE.to_string())
}

fn canonicalize(tag: &str) -> Option<String> {
    if tag.is_empty() {
        return None;
    }

    let normalized = tag.replace('_', "-");
    let mut subtags = normalized.split('-').peekable();
    let mut out: Vec<String> = Vec::new();

    let language = subtags.next()?;
    if !is_alpha(language) || !matches!(language.len(), 2..=3 | 5..=8) {
        return None;
    }
    out.push(language.to_ascii_lowercase());

    if let Some(script) = subtags.next_if(|s| s.len() == 4 && is_alpha(s)) {
        let mut chars = script.chars();
        let mut title = String::with_capacity(4);
        if let Some(first) = chars.next() {
            title.push(first.to_ascii_uppercase());
        }
        title.extend(chars.map(|c| c.to_ascii_lowercase()));
        out.push(title);
    }

    if let Some(region) = subtags.next_if(|s| {
        (s.len() == 2 && is_alpha(s)) || (s.len() == 3 && s.bytes().all(|b| b.is_ascii_digit()))
    }) {
        out.push(region.to_ascii_uppercase());
    }

    let mut variants: Vec<String> = Vec::new();
    while let Some(variant) = subtags.next_if(|s| is_variant(s)) {
        let variant = variant.to_ascii_lowercase();
        if variants.contains(&variant) {
            return None;
        }
        variants.push(variant);
    }
    out.extend(variants);

    // extensions and private use: a singleton followed by at least one subtag
    while let Some(singleton) = subtags.next() {
        if singleton.len() != 1 || !is_alnum(singleton) {
            return None;
        }
        let private_use = singleton.eq_ignore_ascii_case("x");
        let min = if private_use { 1 } else { 2 };

        out.push(singleton.to_ascii_lowercase());

        let mut count = 0;
        while let Some(part) = subtags.next_if(|s| s.len() >= min && s.len() <= 8 && is_alnum(s)) {
            out.push(part.to_ascii_lowercase());
            count += 1;
        }
        if count == 0 {
            return None;
        }
    }

    Some(out.join("-"))
}

fn is_alpha(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphabetic())
}

fn is_alnum(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric())
}

fn is_variant(s: &str) -> bool {
    is_alnum(s)
        && match s.len() {
            5..=8 => true,
            4 => s.as_bytes()[0].is_ascii_digit(),
            _ => false,
        }
}
