//! Cyrillic → Latin transliteration used to build search keys.

/// Latin apostrophe variants users type after `o`/`g`.
const APOSTROPHES: [char; 5] = ['\'', '’', '‘', 'ʻ', 'ʼ'];

/// Transliterate `text` to Latin script without changing case.
///
/// Apostrophe digraphs (`o'`, `g'` and their upper-case forms) are first
/// folded into `ў`/`ғ` so that every apostrophe variant ends up as the same
/// canonical `o'`/`g'` after the table pass. Characters outside the table
/// pass through untouched.
pub fn normalize(text: &str) -> String {
    let folded = fold_digraphs(text);
    let mut out = String::with_capacity(folded.len());
    for c in folded.chars() {
        match latin_for(c) {
            Some(latin) => out.push_str(latin),
            None => out.push(c),
        }
    }
    out
}

/// Transliterated, lower-cased form used for substring matching.
pub fn search_key(text: &str) -> String {
    normalize(text).to_lowercase()
}

fn fold_digraphs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        let replacement = match c {
            'o' => 'ў',
            'O' => 'Ў',
            'g' => 'ғ',
            'G' => 'Ғ',
            _ => {
                out.push(c);
                continue;
            }
        };
        match chars.peek() {
            Some(next) if APOSTROPHES.contains(next) => {
                chars.next();
                out.push(replacement);
            }
            _ => out.push(c),
        }
    }
    out
}

fn latin_for(c: char) -> Option<&'static str> {
    let latin = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "yo",
        'ж' => "j",
        'з' => "z",
        'и' => "i",
        'й' => "y",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "x",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "sh",
        'ъ' => "'",
        'ы' => "i",
        'ь' => "",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        'ў' => "o'",
        'қ' => "q",
        'ғ' => "g'",
        'ҳ' => "h",
        'А' => "A",
        'Б' => "B",
        'В' => "V",
        'Г' => "G",
        'Д' => "D",
        'Е' => "E",
        'Ё' => "Yo",
        'Ж' => "J",
        'З' => "Z",
        'И' => "I",
        'Й' => "Y",
        'К' => "K",
        'Л' => "L",
        'М' => "M",
        'Н' => "N",
        'О' => "O",
        'П' => "P",
        'Р' => "R",
        'С' => "S",
        'Т' => "T",
        'У' => "U",
        'Ф' => "F",
        'Х' => "X",
        'Ц' => "Ts",
        'Ч' => "Ch",
        'Ш' => "Sh",
        'Щ' => "Sh",
        'Ъ' => "'",
        'Ы' => "I",
        'Ь' => "",
        'Э' => "E",
        'Ю' => "Yu",
        'Я' => "Ya",
        'Ў' => "O'",
        'Қ' => "Q",
        'Ғ' => "G'",
        'Ҳ' => "H",
        _ => return None,
    };
    Some(latin)
}
