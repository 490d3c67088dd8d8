//! Lightweight text analysis.
//!
//! Tokenization, stop words, a rule-based lemmatizer, a verb lexicon for
//! part-of-speech guesses, and heuristic product/organization entity
//! detection. Everything is deterministic and table-driven.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::LazyLock;

use super::patterns::{IMAGE_NOUNS, METADATA_NOUNS, MODEL_NOUNS, NOTEBOOK_NOUNS};

/// Common stop words removed during preprocessing.
pub static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
        "from", "as", "is", "was", "are", "were", "been", "be", "being", "have", "has", "had",
        "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall",
        "can", "need", "i", "you", "he", "she", "it", "we", "they", "me", "him", "her", "us",
        "them", "my", "your", "his", "its", "our", "their", "this", "that", "these", "those",
        "what", "which", "who", "whom", "how", "when", "where", "why", "all", "each", "every",
        "both", "few", "more", "most", "other", "some", "such", "no", "nor", "not", "only", "own",
        "same", "so", "than", "too", "very", "just", "about", "also", "now", "here", "there",
        "up", "down", "out", "if", "then", "into", "through", "during", "before", "after",
        "above", "below", "between", "under", "again", "further", "once", "any", "something",
        "anything", "nothing", "please", "me", "let", "using", "via", "per", "whose",
    ]
    .into_iter()
    .collect()
});

/// Short all-caps tokens that are common words rather than product names.
const ENTITY_STOPLIST: &[&str] = &[
    "ai", "ml", "gpu", "cpu", "tpu", "api", "json", "csv", "nlp", "id", "ok", "faq", "url",
];

/// Verb base forms recognized by the part-of-speech guess.
const VERBS: &[&str] = &[
    "compare", "contrast", "differ", "distinguish", "evaluate", "find", "get", "retrieve",
    "show", "display", "tell", "generate", "create", "make", "build", "analyze", "analyse",
    "explore", "examine", "study", "investigate", "search", "list", "give", "describe",
    "explain", "plot", "visualize", "train", "run", "use", "sort", "filter", "rank", "return",
    "fetch", "look", "want", "know", "help", "produce", "perform", "outperform",
    "measure", "rate", "select", "choose", "test", "benchmark", "check", "open", "write",
];

/// Irregular forms mapped to their lemma.
const IRREGULAR: &[(&str, &str)] = &[
    ("analyses", "analysis"),
    ("data", "data"),
    ("criteria", "criterion"),
    ("indices", "index"),
    ("matrices", "matrix"),
    ("children", "child"),
    ("people", "person"),
    ("made", "make"),
    ("built", "build"),
    ("found", "find"),
    ("got", "get"),
    ("gotten", "get"),
    ("shown", "show"),
    ("gave", "give"),
    ("given", "give"),
    ("told", "tell"),
    ("ran", "run"),
    ("running", "run"),
    ("written", "write"),
    ("wrote", "write"),
    ("chose", "choose"),
    ("chosen", "choose"),
    ("plotted", "plot"),
    ("plotting", "plot"),
    ("visualisation", "visualization"),
    ("better", "good"),
    ("best", "good"),
];

static IRREGULAR_FORMS: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| IRREGULAR.iter().copied().collect());

static VERB_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| VERBS.iter().copied().collect());

/// Inflected verb forms (`compares`, `compared`, `comparing`) mapped to the base.
static VERB_FORMS: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    let mut forms = HashMap::new();
    for &base in VERBS {
        for form in inflections(base) {
            forms.entry(form).or_insert(base);
        }
    }
    forms
});

static DOMAIN_NOUNS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    NOTEBOOK_NOUNS
        .iter()
        .chain(IMAGE_NOUNS)
        .chain(METADATA_NOUNS)
        .chain(MODEL_NOUNS)
        .copied()
        .collect()
});

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

fn ends_with_consonant_y(word: &str) -> bool {
    let mut chars = word.chars().rev();
    chars.next() == Some('y') && chars.next().is_some_and(|c| !is_vowel(c))
}

fn inflections(base: &str) -> Vec<String> {
    let stem_y = base.strip_suffix('y').unwrap_or(base);
    let third_person = if ["s", "sh", "ch", "x", "z"].iter().any(|s| base.ends_with(s)) {
        format!("{base}es")
    } else if ends_with_consonant_y(base) {
        format!("{stem_y}ies")
    } else {
        format!("{base}s")
    };
    let past = if base.ends_with('e') {
        format!("{base}d")
    } else if ends_with_consonant_y(base) {
        format!("{stem_y}ied")
    } else {
        format!("{base}ed")
    };
    let gerund = match base.strip_suffix('e') {
        Some(stem) if !stem.ends_with('e') => format!("{stem}ing"),
        _ => format!("{base}ing"),
    };
    vec![third_person, past, gerund]
}

/// Returns the lemma of a lowercase word.
#[must_use]
pub fn lemmatize(word: &str) -> String {
    if let Some(lemma) = IRREGULAR_FORMS.get(word) {
        return (*lemma).to_string();
    }
    if VERB_SET.contains(word) || DOMAIN_NOUNS.contains(word) {
        return word.to_string();
    }
    if let Some(base) = VERB_FORMS.get(word) {
        return (*base).to_string();
    }
    if word.len() <= 3 || word.chars().any(|c| !c.is_alphabetic()) {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix("ies") {
        if word.len() > 4 {
            return format!("{stem}y");
        }
    }
    if word.ends_with("sses") || ["ches", "shes", "xes"].iter().any(|s| word.ends_with(s)) {
        return word[..word.len() - 2].to_string();
    }
    if ["ss", "us", "is"].iter().any(|s| word.ends_with(s)) {
        return word.to_string();
    }
    word.strip_suffix('s').unwrap_or(word).to_string()
}

/// Returns true if the lowercase lemma is a known verb.
#[must_use]
pub fn is_verb(lemma: &str) -> bool {
    VERB_SET.contains(lemma)
}

/// A whitespace-delimited token with surrounding punctuation removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    /// Token text as written.
    pub text: &'a str,
    /// Lowercased text.
    pub lower: String,
}

/// Splits text into tokens, dropping punctuation-only chunks and possessive `'s`.
#[must_use]
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    text.split_whitespace()
        .filter_map(|chunk| {
            let trimmed = chunk.trim_matches(|c: char| !c.is_alphanumeric());
            let trimmed = trimmed
                .strip_suffix("'s")
                .or_else(|| trimmed.strip_suffix("’s"))
                .unwrap_or(trimmed);
            (!trimmed.is_empty()).then(|| Token {
                text: trimmed,
                lower: trimmed.to_lowercase(),
            })
        })
        .collect()
}

fn is_quantity(lower: &str) -> bool {
    let body = lower.trim_end_matches(['k', 'm', 'b', 't']);
    !body.is_empty() && body.chars().all(|c| c.is_ascii_digit() || c == '.')
}

fn is_dimensions(lower: &str) -> bool {
    lower
        .split_once(['x', '×'])
        .is_some_and(|(w, h)| {
            !w.is_empty()
                && !h.is_empty()
                && w.chars().all(|c| c.is_ascii_digit())
                && h.chars().all(|c| c.is_ascii_digit())
        })
}

/// Heuristic product/organization entity test.
///
/// A token qualifies when it contains a letter and either mixes letters with
/// digits (`GPT-2`, `t5`), is all-caps of length two or more (`BERT`), or has
/// an uppercase letter after the first character (`ResNet`, `LLaMA`).
fn is_entity(token: &Token<'_>) -> bool {
    let text = token.text;
    if !text.chars().any(char::is_alphabetic)
        || ENTITY_STOPLIST.contains(&token.lower.as_str())
        || is_quantity(&token.lower)
        || is_dimensions(&token.lower)
        || STOP_WORDS.contains(token.lower.as_str())
    {
        return false;
    }
    let has_digit = text.chars().any(|c| c.is_ascii_digit());
    let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
    let all_caps = letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase());
    let inner_upper = text.chars().skip(1).any(char::is_uppercase);
    has_digit || all_caps || inner_upper
}

fn is_version_number(lower: &str) -> bool {
    lower.starts_with(|c: char| c.is_ascii_digit())
        && lower.chars().all(|c| c.is_ascii_digit() || c == '.')
}

/// Marks tokens that belong to an entity span. A bare version number directly
/// after an entity token extends the span (`LLaMA 2`).
fn entity_mask(tokens: &[Token<'_>]) -> Vec<bool> {
    let mut mask: Vec<bool> = Vec::with_capacity(tokens.len());
    for token in tokens {
        let extends = mask.last().copied().unwrap_or(false) && is_version_number(&token.lower);
        mask.push(extends || is_entity(token));
    }
    mask
}

/// Returns entity spans (runs of adjacent entity tokens), as written.
#[must_use]
pub fn entities(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let mask = entity_mask(&tokens);
    let mut spans = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for (token, is_entity) in tokens.iter().zip(mask) {
        if is_entity {
            current.push(token.text);
        } else if !current.is_empty() {
            spans.push(current.join(" "));
            current.clear();
        }
    }
    if !current.is_empty() {
        spans.push(current.join(" "));
    }
    spans
}

/// Normalizes query text for semantic search.
///
/// Stop words, punctuation and single-character tokens are removed and the
/// rest lemmatized and lowercased. Entity spans are kept verbatim, in reading
/// order.
#[must_use]
pub fn preprocess(text: &str) -> String {
    let tokens = tokenize(text.trim());
    let mask = entity_mask(&tokens);
    let mut out: Vec<String> = Vec::new();
    let mut run: Vec<&str> = Vec::new();

    for (token, is_entity) in tokens.iter().zip(mask) {
        if is_entity {
            run.push(token.text);
            continue;
        }
        if !run.is_empty() {
            out.push(run.join(" "));
            run.clear();
        }
        if STOP_WORDS.contains(token.lower.as_str()) || token.lower.chars().count() <= 1 {
            continue;
        }
        out.push(lemmatize(&token.lower));
    }
    if !run.is_empty() {
        out.push(run.join(" "));
    }

    out.join(" ")
}

/// Part-of-speech guess: lemmas of verbs and of nouns in the text.
///
/// Verbs come from the verb lexicon. Every other alphabetic content word is
/// treated as a noun; domain vocabulary words count as nouns even when they
/// double as verbs. Entity tokens are proper nouns and excluded.
#[must_use]
pub fn verbs_and_nouns(text: &str) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut verbs = BTreeSet::new();
    let mut nouns = BTreeSet::new();

    for token in tokenize(text) {
        if STOP_WORDS.contains(token.lower.as_str())
            || is_entity(&token)
            || !token.lower.chars().all(|c| c.is_alphabetic() || c == '-')
        {
            continue;
        }
        let lemma = lemmatize(&token.lower);
        let domain = DOMAIN_NOUNS.contains(lemma.as_str());
        if is_verb(&lemma) {
            verbs.insert(lemma.clone());
            if domain {
                nouns.insert(lemma);
            }
        } else if lemma.chars().count() > 1 || domain {
            nouns.insert(lemma);
        }
    }

    (verbs, nouns)
}
