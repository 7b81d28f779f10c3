//! URL-safe slugs from titles

/// Derive a slug: lowercase ASCII letters and digits joined by single `-`
///
/// Turkish letters fold to their ASCII base; every other run of
/// characters outside `[a-z0-9]` becomes one hyphen, and hyphens at either
/// end are dropped. Slugifying a slug returns it unchanged.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.chars().flat_map(fold_turkish) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Lowercase `c`, folding Turkish letters to ASCII
fn fold_turkish(c: char) -> impl Iterator<Item = char> {
    let folded = match c {
        'İ' | 'I' | 'ı' | 'î' | 'Î' => Some('i'),
        'Ğ' | 'ğ' => Some('g'),
        'Ü' | 'ü' | 'û' | 'Û' => Some('u'),
        'Ş' | 'ş' => Some('s'),
        'Ö' | 'ö' => Some('o'),
        'Ç' | 'ç' => Some('c'),
        'Â' | 'â' => Some('a'),
        _ => None,
    };

    let lower = folded
        .is_none()
        .then(|| c.to_lowercase())
        .into_iter()
        .flatten();

    folded.into_iter().chain(lower)
}
