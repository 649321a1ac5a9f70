/// Contractor-shorthand expansions applied to whole words (punctuation on
/// the word is preserved).
const WORD_EXPANSIONS: &[(&str, &str)] = &[
    ("rm", "room"),
    ("rms", "rooms"),
    ("bldg", "building"),
    ("bsmt", "basement"),
    ("apt", "apartment"),
    ("eggshel", "eggshell"),
    ("egshell", "eggshell"),
];

/// Multi-word expansions, matched on word cores in sequence.
const PHRASE_EXPANSIONS: &[(&[&str], &[&str])] = &[
    (&["1", "coat"], &["one", "coat"]),
    (&["2", "coats"], &["two", "coats"]),
    (&["3", "coats"], &["three", "coats"]),
    (&["egg", "shell"], &["eggshell"]),
];

/// Deterministic description cleanup. Always succeeds, and is idempotent:
/// running it on its own output changes nothing.
///
/// Collapses whitespace runs and immediately-repeated words, expands a fixed
/// shorthand table, capitalizes the first letter, and ensures a terminal
/// period. This output is also the fallback when no external rewriter is
/// configured or the rewrite call fails.
pub fn normalize(text: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    for token in text.split_whitespace() {
        if words.last().is_some_and(|prev| prev.eq_ignore_ascii_case(token)) {
            continue;
        }
        words.push(token.to_string());
    }

    let words = expand_phrases(words);
    let words: Vec<String> = words.into_iter().map(expand_word).collect();

    let mut out = words.join(" ");
    capitalize_first(&mut out);
    if out.chars().last().is_some_and(|ch| ch.is_alphanumeric()) {
        out.push('.');
    }
    out
}

fn expand_phrases(words: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(words.len());
    let mut index = 0;

    'outer: while index < words.len() {
        for (pattern, replacement) in PHRASE_EXPANSIONS {
            let end = index + pattern.len();
            if end > words.len() {
                continue;
            }
            let matches = pattern
                .iter()
                .enumerate()
                .all(|(offset, word)| word_core(&words[index + offset]) == *word);
            if !matches {
                continue;
            }

            // Keep the leading punctuation of the first word and the
            // trailing punctuation of the last.
            let (prefix, _, _) = split_word(&words[index]);
            let (_, _, suffix) = split_word(&words[end - 1]);
            for (offset, replaced) in replacement.iter().enumerate() {
                let mut word = String::new();
                if offset == 0 {
                    word.push_str(prefix);
                }
                word.push_str(replaced);
                if offset == replacement.len() - 1 {
                    word.push_str(suffix);
                }
                out.push(word);
            }
            index = end;
            continue 'outer;
        }

        out.push(words[index].clone());
        index += 1;
    }
    out
}

fn expand_word(word: String) -> String {
    let (prefix, core, suffix) = split_word(&word);
    let lowered = core.to_lowercase();
    match WORD_EXPANSIONS.iter().find(|(short, _)| *short == lowered) {
        Some((_, full)) => format!("{prefix}{full}{suffix}"),
        None => word,
    }
}

fn word_core(word: &str) -> String {
    split_word(word).1.to_lowercase()
}

/// Split a token into (leading punctuation, core, trailing punctuation).
fn split_word(word: &str) -> (&str, &str, &str) {
    let start = word.find(|ch: char| ch.is_alphanumeric()).unwrap_or(word.len());
    let end = word.rfind(|ch: char| ch.is_alphanumeric()).map_or(start, |pos| pos + 1);
    (&word[..start], &word[start..end], &word[end..])
}

/// Uppercase the leading letter. Descriptions that open with a quantity
/// ("800 sf of ...") are left alone rather than capitalizing mid-sentence.
fn capitalize_first(text: &mut String) {
    let Some(first) = text.chars().next() else {
        return;
    };
    if first.is_alphabetic() && !first.is_uppercase() {
        let upper: String = first.to_uppercase().collect();
        text.replace_range(..first.len_utf8(), &upper);
    }
}
