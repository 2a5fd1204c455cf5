//! Filename- and URL-safe slugs.

use once_cell::sync::Lazy;
use regex::Regex;

static NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_]+").unwrap());

/// Make a filename-friendly approximation of a string.
///
/// The result only uses the characters `a-z`, `0-9`, `_` and `-`.
///
/// ```
/// use meetupdb::document::slugify;
///
/// assert_eq!(slugify("Brněnské Pyvo"), "brnenske-pyvo");
/// assert_eq!(slugify("  Na Věnečku! "), "na-venecku");
/// ```
pub fn slugify(name: &str) -> String {
    let mut ascii = String::with_capacity(name.len());
    for c in name.chars() {
        match fold(c) {
            Some(folded) => ascii.push_str(folded),
            None if c.is_ascii() => ascii.push(c),
            None => ascii.push('-'),
        }
    }
    NON_SLUG
        .replace_all(&ascii.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

/// Check whether a key is already in slug form.
pub fn is_slug(key: &str) -> bool {
    !key.is_empty() && slugify(key) == key
}

/// ASCII approximation of a Latin-1 or Latin Extended-A letter.
fn fold(c: char) -> Option<&'static str> {
    let folded = match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' | 'Ā' | 'Ă' | 'Ą' => "A",
        'æ' => "ae",
        'Æ' => "AE",
        'č' | 'ć' | 'ç' | 'ĉ' | 'ċ' => "c",
        'Č' | 'Ć' | 'Ç' | 'Ĉ' | 'Ċ' => "C",
        'ď' | 'đ' => "d",
        'Ď' | 'Đ' => "D",
        'é' | 'è' | 'ê' | 'ë' | 'ě' | 'ē' | 'ĕ' | 'ė' | 'ę' => "e",
        'É' | 'È' | 'Ê' | 'Ë' | 'Ě' | 'Ē' | 'Ĕ' | 'Ė' | 'Ę' => "E",
        'ğ' | 'ĝ' | 'ġ' | 'ģ' => "g",
        'Ğ' | 'Ĝ' | 'Ġ' | 'Ģ' => "G",
        'ĥ' | 'ħ' => "h",
        'Ĥ' | 'Ħ' => "H",
        'í' | 'ì' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => "i",
        'Í' | 'Ì' | 'Î' | 'Ï' | 'Ĩ' | 'Ī' | 'Ĭ' | 'Į' | 'İ' => "I",
        'ĵ' => "j",
        'Ĵ' => "J",
        'ķ' => "k",
        'Ķ' => "K",
        'ĺ' | 'ľ' | 'ļ' | 'ł' | 'ŀ' => "l",
        'Ĺ' | 'Ľ' | 'Ļ' | 'Ł' | 'Ŀ' => "L",
        'ñ' | 'ń' | 'ň' | 'ņ' => "n",
        'Ñ' | 'Ń' | 'Ň' | 'Ņ' => "N",
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' | 'ō' | 'ŏ' | 'ő' => "o",
        'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' | 'Ø' | 'Ō' | 'Ŏ' | 'Ő' => "O",
        'œ' => "oe",
        'Œ' => "OE",
        'ŕ' | 'ř' | 'ŗ' => "r",
        'Ŕ' | 'Ř' | 'Ŗ' => "R",
        'ś' | 'š' | 'ş' | 'ŝ' | 'ș' => "s",
        'Ś' | 'Š' | 'Ş' | 'Ŝ' | 'Ș' => "S",
        'ß' => "ss",
        'ť' | 'ţ' | 'ŧ' | 'ț' => "t",
        'Ť' | 'Ţ' | 'Ŧ' | 'Ț' => "T",
        'ú' | 'ù' | 'û' | 'ü' | 'ů' | 'ũ' | 'ū' | 'ŭ' | 'ű' | 'ų' => "u",
        'Ú' | 'Ù' | 'Û' | 'Ü' | 'Ů' | 'Ũ' | 'Ū' | 'Ŭ' | 'Ű' | 'Ų' => "U",
        'ŵ' => "w",
        'Ŵ' => "W",
        'ý' | 'ÿ' | 'ŷ' => "y",
        'Ý' | 'Ÿ' | 'Ŷ' => "Y",
        'ž' | 'ź' | 'ż' => "z",
        'Ž' | 'Ź' | 'Ż' => "Z",
        _ => return None,
    };
    Some(folded)
}
