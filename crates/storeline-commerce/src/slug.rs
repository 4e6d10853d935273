//! URL slug generation.

/// Convert arbitrary text into a URL-friendly slug.
///
/// ASCII letters and digits are kept (lower-cased), common accented Latin
/// letters are folded to ASCII, and every other run of characters becomes a
/// single `-`. Text with nothing usable becomes `"item"`.
///
/// ```
/// use storeline_commerce::slug::slugify;
/// assert_eq!(slugify("  Crème Brûlée & Co. "), "creme-brulee-co");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        let folded = fold(c);
        if folded.is_empty() {
            pending_dash = !slug.is_empty();
            continue;
        }
        if pending_dash {
            slug.push('-');
            pending_dash = false;
        }
        slug.push_str(folded);
    }

    if slug.is_empty() {
        "item".to_string()
    } else {
        slug
    }
}

/// Return the first of `base`, `base-2`, `base-3`, ... for which `taken` is false.
pub fn unique_slug(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn fold(c: char) -> &'static str {
    const ASCII: [&str; 36] = [
        "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r",
        "s", "t", "u", "v", "w", "x", "y", "z", "0", "1", "2", "3", "4", "5", "6", "7", "8", "9",
    ];

    match c {
        'a'..='z' => ASCII[(c as u8 - b'a') as usize],
        'A'..='Z' => ASCII[(c as u8 - b'A') as usize],
        '0'..='9' => ASCII[26 + (c as u8 - b'0') as usize],
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => "a",
        'æ' | 'Æ' => "ae",
        'ç' | 'Ç' => "c",
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => "i",
        'ñ' | 'Ñ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => "o",
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => "u",
        'ý' | 'ÿ' | 'Ý' => "y",
        'ß' => "ss",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Summer Dresses"), "summer-dresses");
        assert_eq!(slugify("T-Shirts (Men's)"), "t-shirts-men-s");
        assert_eq!(slugify("--Already--slugged--"), "already-slugged");
    }

    #[test]
    fn test_slugify_empty() {
        assert_eq!(slugify(""), "item");
        assert_eq!(slugify("!!!"), "item");
    }

    #[test]
    fn test_slugify_accents() {
        assert_eq!(slugify("Ärger Straße"), "arger-strasse");
    }

    #[test]
    fn test_unique_slug() {
        let taken = ["shirt", "shirt-2"];
        assert_eq!(unique_slug("shirt", |s| taken.contains(&s)), "shirt-3");
        assert_eq!(unique_slug("pants", |s| taken.contains(&s)), "pants");
    }
}
