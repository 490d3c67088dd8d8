//! Pattern library.
//!
//! Static intent-detection signals, parameter-extraction patterns and the
//! fixed vocabularies used by the linguistic tier. Everything here is data;
//! the classifier and extractor decide how to apply it.
// Allow expect() on static regex patterns - these are guaranteed to compile
#![allow(clippy::expect_used)]

use crate::models::Intent;
use regex::Regex;
use std::sync::LazyLock;

/// An intent-detection pattern.
#[derive(Debug)]
pub struct IntentSignal {
    /// The regex pattern to match.
    pub pattern: Regex,
    /// The intent this pattern indicates.
    pub intent: Intent,
    /// Human-readable description of the signal.
    pub description: &'static str,
}

/// Intent signals grouped by intent, in evaluation order within each group.
pub static INTENT_SIGNALS: LazyLock<Vec<IntentSignal>> = LazyLock::new(|| {
    vec![
        // Retrieval
        IntentSignal {
            pattern: Regex::new(
                r"(?i)\b(find|get|retrieve|show|display|tell\s+me\s+about|information\s+on|details\s+of)\b",
            )
            .expect("static regex: find/get/show"),
            intent: Intent::Retrieval,
            description: "find/get/retrieve/show/tell me about",
        },
        IntentSignal {
            pattern: Regex::new(r"(?i)\b(what|how|where)\s+(is|are)\b|\bwhen\s+(was|were)\b")
                .expect("static regex: what is"),
            intent: Intent::Retrieval,
            description: "what/how/where is, when was",
        },
        // Comparison
        IntentSignal {
            pattern: Regex::new(
                r"(?i)\b(compar\w*|versus|vs|difference\s+between|similarities\s+between|better\s+than)\b",
            )
            .expect("static regex: compare/versus"),
            intent: Intent::Comparison,
            description: "compare/versus/vs/difference between",
        },
        IntentSignal {
            pattern: Regex::new(r"(?i)\bwhich\s+(is|are)\s+(better|worse|faster|more\s+accurate)\b")
                .expect("static regex: which is better"),
            intent: Intent::Comparison,
            description: "which is better/worse/faster",
        },
        IntentSignal {
            pattern: Regex::new(
                r"(?i)\b(compare|comparing)\s+the\s+(performance|accuracy|results)\s+of\b",
            )
            .expect("static regex: comparing the performance of"),
            intent: Intent::Comparison,
            description: "comparing the performance/accuracy/results of",
        },
        // Notebook
        IntentSignal {
            pattern: Regex::new(
                r"(?i)\b(create|generate|make|build)\s+(a\s+|an\s+)?(notebook|colab|code|script)",
            )
            .expect("static regex: create a notebook"),
            intent: Intent::Notebook,
            description: "create/generate a notebook/colab/script",
        },
        IntentSignal {
            pattern: Regex::new(r"(?i)\b(jupyter|analysis\s+script|analysis\s+code)")
                .expect("static regex: jupyter"),
            intent: Intent::Notebook,
            description: "jupyter/analysis script",
        },
        IntentSignal {
            pattern: Regex::new(r"(?i)\bnotebook\s+(for|to)\s+(analyze|explore|compare)")
                .expect("static regex: notebook to analyze"),
            intent: Intent::Notebook,
            description: "notebook for/to analyze",
        },
        // Image search
        IntentSignal {
            pattern: Regex::new(r"(?i)\b(find|get|retrieve|show|display)\s+(image|picture|photo)")
                .expect("static regex: find images"),
            intent: Intent::ImageSearch,
            description: "find/show images/pictures/photos",
        },
        IntentSignal {
            pattern: Regex::new(r"(?i)\b(generated|created)\s+(by|with|using)\b")
                .expect("static regex: generated by"),
            intent: Intent::ImageSearch,
            description: "generated/created by/with/using",
        },
        IntentSignal {
            pattern: Regex::new(r"(?i)\b(show|find|get)\s+(me\s+)?(examples|samples)\s+(of|from)\b")
                .expect("static regex: show me samples"),
            intent: Intent::ImageSearch,
            description: "show me examples/samples of",
        },
        // Metadata
        IntentSignal {
            pattern: Regex::new(r"(?i)\b(metadata|schema|fields|properties|attributes)\b")
                .expect("static regex: metadata/schema"),
            intent: Intent::Metadata,
            description: "metadata/schema/fields/properties",
        },
        IntentSignal {
            pattern: Regex::new(r"(?i)\bwhat\s+(fields|properties|attributes)\s+(does|do)\b")
                .expect("static regex: what fields does"),
            intent: Intent::Metadata,
            description: "what fields/properties does",
        },
        IntentSignal {
            pattern: Regex::new(r"(?i)\b(structure|organization)\s+of\b")
                .expect("static regex: structure of"),
            intent: Intent::Metadata,
            description: "structure/organization of",
        },
    ]
});

/// Returns true if any signal for `intent` matches `text`.
#[must_use]
pub fn matches_intent(text: &str, intent: Intent) -> bool {
    INTENT_SIGNALS
        .iter()
        .filter(|signal| signal.intent == intent)
        .any(|signal| signal.pattern.is_match(text))
}

/// Returns the descriptions of every signal matching `text`.
#[must_use]
pub fn matched_signals(text: &str) -> Vec<(Intent, &'static str)> {
    INTENT_SIGNALS
        .iter()
        .filter(|signal| signal.pattern.is_match(text))
        .map(|signal| (signal.intent, signal.description))
        .collect()
}

/// Explicit `model id: X` / `model X` mentions. Group 2 is the identifier.
pub static MODEL_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(model[_\s-]?id|model)[:\s]+([a-z0-9_.-]+)").expect("static regex: model id")
});

/// Metric vocabulary.
pub static METRIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(accuracy|loss|perplexity|clip[_-]?score|performance)\b")
        .expect("static regex: metric")
});

/// Kinds of filters the extractor recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// `architecture: transformer`
    Architecture,
    /// `framework: pytorch`
    Framework,
    /// `parameters greater than 7B`
    ParameterCount,
    /// `created after 2023-01-01`
    Date,
}

/// A filter-extraction pattern.
#[derive(Debug)]
pub struct FilterSignal {
    /// The regex pattern to match.
    pub pattern: Regex,
    /// The filter it produces.
    pub kind: FilterKind,
}

/// Filter patterns.
///
/// Capture groups: architecture and framework capture the value in group 1;
/// parameter-count captures operator (1) and value (2); date captures field
/// (1), operator (2) and value (3).
pub static FILTER_SIGNALS: LazyLock<Vec<FilterSignal>> = LazyLock::new(|| {
    vec![
        FilterSignal {
            pattern: Regex::new(r"(?i)\barchitecture[:\s]+(transformer|cnn|rnn|mlp|diffusion|gan)\b")
                .expect("static regex: architecture filter"),
            kind: FilterKind::Architecture,
        },
        FilterSignal {
            pattern: Regex::new(r"(?i)\bframework[:\s]+(pytorch|tensorflow|jax)\b")
                .expect("static regex: framework filter"),
            kind: FilterKind::Framework,
        },
        FilterSignal {
            pattern: Regex::new(
                r"(?i)\b(?:parameters|params)[\s:]+(greater\s+than|less\s+than|equal\s+to|>|<|=)\s*(\d+(?:\.\d+)?[kmbt]?)\b",
            )
            .expect("static regex: parameter count filter"),
            kind: FilterKind::ParameterCount,
        },
        FilterSignal {
            pattern: Regex::new(
                r"(?i)\b(created|modified|updated)[\s:]+(before|after|between|since)\s+([a-z0-9_-]+)",
            )
            .expect("static regex: date filter"),
            kind: FilterKind::Date,
        },
    ]
});

/// `limit/top/first N`.
pub static LIMIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:limit|top|first)\s+(\d+)\b").expect("static regex: limit")
});

/// `sort/order by FIELD [ascending|descending|asc|desc]`.
pub static SORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:sort|order)(?:ed)?\s+(?:by|on)\s+([a-z_]+)(?:\s+(ascending|descending|asc|desc)\b)?",
    )
    .expect("static regex: sort")
});

/// Model family keywords, longest first, each allowing a version suffix.
pub static MODEL_FAMILIES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"stable[-_ ]?diffusion",
        r"transformer",
        r"diffusion",
        r"dall-?e",
        r"resnet",
        r"llama",
        r"bert",
        r"clip",
        r"swin",
        r"yolo",
        r"gpt",
        r"cnn",
        r"vit",
        r"vae",
        r"gan",
        r"t5",
    ]
    .into_iter()
    .map(|family| {
        Regex::new(&format!(r"(?i)\b{family}(?:[-_]?(?:\d+(?:\.\d+)?|v\d+))?\b"))
            .expect("static regex: model family")
    })
    .collect()
});

/// Comparison dimensions after `compare ... on/by/in terms of/regarding`.
pub static COMPARISON_DIMENSIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:compare|comparing|comparison)\b.*?\b(?:on|by|in\s+terms\s+of|regarding)\s+([\w\s,]+)",
    )
    .expect("static regex: comparison dimensions")
});

/// Display/plot verbs that request a visualization.
pub static VISUALIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(show|display|visuali[sz]e|plot|graph|chart)\b")
        .expect("static regex: visualize")
});

/// Analysis types for notebook requests.
pub static ANALYSIS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:analyze|analyse|analysis|examine|study|investigate)\s+([\w\s,]+)")
        .expect("static regex: analysis")
});

/// Dataset name for notebook requests.
pub static DATASET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:dataset|data)[:\s]+([\w\s-]+)").expect("static regex: dataset")
});

/// Resource hint for notebook requests.
pub static RESOURCES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:using|with)\s+([\w\s]+)\s+(?:resources|gpu|memory|cpu)\b")
        .expect("static regex: resources")
});

/// Prompt terms for image search.
pub static PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:prompt|prompts|text)[:\s]+["']?([\w\s,]+)"#)
        .expect("static regex: prompt")
});

/// Style tags for image search.
pub static STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:style|type|category|look)[:\s]+["']?([\w\s,]+)"#)
        .expect("static regex: style")
});

/// `resolution/size/dimensions W x H`.
pub static RESOLUTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:resolution|size|dimensions)[:\s]+(\d+)\s*[x×]\s*(\d+)")
        .expect("static regex: resolution")
});

/// Start of the next image-search field inside a captured phrase.
pub static IMAGE_FIELD_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)[,;]?\s*\b(?:in\s+)?(?:prompts?|text|style|type|category|look|resolution|size|dimensions)\b",
    )
    .expect("static regex: image field label")
});

/// List separator: commas or a standalone `and`.
pub static LIST_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i),|\s+and\s+").expect("static regex: list separator"));

/// Verbs that signal a comparison in the linguistic tier.
pub const COMPARISON_VERBS: &[&str] = &["compare", "contrast", "differ", "distinguish", "evaluate"];

/// Nouns that signal a notebook request.
pub const NOTEBOOK_NOUNS: &[&str] = &["notebook", "colab", "code", "script", "analysis"];

/// Nouns that signal an image search.
pub const IMAGE_NOUNS: &[&str] = &[
    "image",
    "picture",
    "photo",
    "visualization",
    "render",
    "sample",
];

/// Nouns that signal a metadata question.
pub const METADATA_NOUNS: &[&str] = &[
    "metadata",
    "schema",
    "field",
    "property",
    "attribute",
    "structure",
];

/// Generic model nouns that signal retrieval.
pub const MODEL_NOUNS: &[&str] = &[
    "model",
    "transformer",
    "neural",
    "network",
    "ai",
    "architecture",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_signals_compile() {
        assert_eq!(INTENT_SIGNALS.len(), 14);
        assert_eq!(FILTER_SIGNALS.len(), 4);
        assert_eq!(MODEL_FAMILIES.len(), 16);
    }

    #[test]
    fn test_every_intent_but_unknown_has_signals() {
        for intent in Intent::ALL {
            let has = INTENT_SIGNALS.iter().any(|s| s.intent == intent);
            assert_eq!(has, intent != Intent::Unknown, "{intent}");
        }
    }

    #[test]
    fn test_comparison_word_boundaries() {
        assert!(matches_intent("gpt-2 vs bert", Intent::Comparison));
        assert!(matches_intent("comparing both", Intent::Comparison));
        assert!(!matches_intent("the dvs sensor", Intent::Comparison));
    }

    #[test]
    fn test_image_signal_matches_plural() {
        assert!(matches_intent("find images of cats", Intent::ImageSearch));
        assert!(matches_intent("show me samples from vae", Intent::ImageSearch));
    }

    #[test]
    fn test_notebook_signal() {
        assert!(matches_intent("generate a notebook for bert", Intent::Notebook));
        assert!(matches_intent("open jupyter", Intent::Notebook));
        assert!(!matches_intent("generate images", Intent::Notebook));
    }

    #[test]
    fn test_metadata_signal() {
        assert!(matches_intent("what fields does the catalog have", Intent::Metadata));
        assert!(matches_intent("structure of the records", Intent::Metadata));
    }

    #[test]
    fn test_matched_signals_reports_descriptions() {
        let matched = matched_signals("compare gpt-2 and bert");
        assert!(matched.iter().any(|(intent, _)| *intent == Intent::Comparison));
    }

    #[test]
    fn test_family_version_suffix() {
        let gpt = &MODEL_FAMILIES[10];
        assert_eq!(gpt.find("try gpt-3.5 now").map(|m| m.as_str()), Some("gpt-3.5"));
        let sd = &MODEL_FAMILIES[0];
        assert_eq!(
            sd.find("stable diffusion v2").map(|m| m.as_str()),
            Some("stable diffusion")
        );
    }

    #[test]
    fn test_list_separator() {
        let parts: Vec<&str> = LIST_SEPARATOR.split("speed, accuracy and size").collect();
        assert_eq!(parts, vec!["speed", " accuracy", "size"]);
    }
}
