use lazy_static::lazy_static;
use regex::Regex;

/// Fragments this short are dropped by [`clean_field`].
const MIN_KEYWORD_CHARS: usize = 5;

lazy_static! {
    // Applied in order, each to the output of the previous one.
    static ref SEPARATORS: Vec<Regex> = [
        r",",
        r";",
        r"/",
        r"\s+[-\u{2013}\u{2014}]\s*|\s*[-\u{2013}\u{2014}]\s+",
        r"\.\s+",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("separator pattern compiles"))
    .collect();

    static ref PARENTHESISED: Regex = Regex::new(r"\s*\([^()]*\)").expect("parenthesis pattern compiles");
    static ref BRACKETED: Regex = Regex::new(r"\s*\[[^\]]*\]\s*").expect("bracket pattern compiles");
}


/// Breaks a field holding several keywords into trimmed, non-empty fragments.
pub fn split_keywords(raw: &str) -> Vec<String> {
    let mut fragments = vec![raw.to_string()];

    for separator in SEPARATORS.iter() {
        fragments = fragments
            .iter()
            .flat_map(|fragment| separator.split(fragment).map(str::to_string))
            .collect();
    }

    fragments
        .into_iter()
        .map(|fragment| fragment.trim().to_string())
        .filter(|fragment| !fragment.is_empty())
        .collect()
}


/// Drops `( … )` and `[ … ]` asides and anything after an unmatched `(`.
pub fn strip_annotations(raw: &str) -> String {
    let without_parens = PARENTHESISED.replace_all(raw, "");
    let head = without_parens
        .split_once('(')
        .map(|(head, _)| head)
        .unwrap_or(without_parens.as_ref());
    BRACKETED.replace_all(head, " ").trim().to_string()
}


pub fn clean_field(raw: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();

    for fragment in split_keywords(&strip_annotations(raw)) {
        if fragment.chars().count() < MIN_KEYWORD_CHARS {
            continue;
        }
        if !keywords.contains(&fragment) {
            keywords.push(fragment);
        }
    }

    keywords
}
