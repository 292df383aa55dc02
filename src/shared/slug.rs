//! Slug normalization
//!
//! Turns arbitrary text into an identifier token made of lowercase ASCII
//! letters, digits and a separator. Runs of any other character collapse
//! into a single separator, and the result never starts or ends with one.

/// Separator used for usernames
pub const USERNAME_SEPARATOR: char = '_';

/// Fold common Latin letters with diacritics to their ASCII spelling.
fn fold_latin(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'ä' | 'æ' => "ae",
        'ç' | 'ć' | 'č' => "c",
        'ď' | 'đ' | 'ð' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => "e",
        'ğ' => "g",
        'ì' | 'í' | 'î' | 'ï' | 'ı' => "i",
        'ł' => "l",
        'ñ' | 'ń' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ø' | 'ő' => "o",
        'ö' | 'œ' => "oe",
        'ř' => "r",
        'ś' | 'š' | 'ş' => "s",
        'ß' => "ss",
        'ť' | 'ţ' => "t",
        'þ' => "th",
        'ù' | 'ú' | 'û' | 'ů' | 'ű' => "u",
        'ü' => "ue",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        _ => return None,
    };
    Some(folded)
}

/// Slugify `input` using `separator`.
pub fn slugify_with(input: &str, separator: char) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_separator = false;

    for c in input.chars().flat_map(char::to_lowercase) {
        let mut buf = [0u8; 4];
        let piece = if c.is_ascii_alphanumeric() {
            Some(&*c.encode_utf8(&mut buf))
        } else {
            fold_latin(c)
        };

        match piece {
            Some(piece) => {
                if pending_separator && !out.is_empty() {
                    out.push(separator);
                }
                pending_separator = false;
                out.push_str(piece);
            }
            None => pending_separator = true,
        }
    }

    out
}

/// Slugify `input` into a username token (`[a-z0-9_]`).
pub fn slugify_username(input: &str) -> String {
    slugify_with(input, USERNAME_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_joins_words() {
        assert_eq!(slugify_username("Jane Doe"), "jane_doe");
        assert_eq!(slugify_username("ADMIN"), "admin");
    }

    #[test]
    fn collapses_runs_and_trims_edges() {
        assert_eq!(slugify_username("  --Hello,,  World!! "), "hello_world");
        assert_eq!(slugify_username("a___b"), "a_b");
    }

    #[test]
    fn folds_accented_letters() {
        assert_eq!(slugify_username("Jürgen Åström"), "juergen_astroem");
        assert_eq!(slugify_username("Straße"), "strasse");
    }

    #[test]
    fn drops_unknown_scripts() {
        assert_eq!(slugify_username("日本 user"), "user");
        assert_eq!(slugify_username("!!!"), "");
    }

    #[test]
    fn is_idempotent() {
        for input in ["Jane Doe", "a-b-c", "x__y", "Crème Brûlée 2", "_lead_"] {
            let once = slugify_username(input);
            assert_eq!(slugify_username(&once), once);
        }
    }

    #[test]
    fn custom_separator() {
        assert_eq!(slugify_with("Hello World", '-'), "hello-world");
    }
}
