//! Interpretation of free-text classifier responses.

// Allow expect() on static regex patterns - these are guaranteed to compile
#![allow(clippy::expect_used)]

use super::TierOutcome;
use crate::models::{DetectionSource, Intent};
use regex::Regex;
use std::sync::LazyLock;

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)""#).expect("static regex: quoted"));

/// Maps a classifier response to an intent.
///
/// Tried in order: intent names at the start of a quoted substring, then any
/// intent name anywhere in the response, then the text before the first
/// colon with spaces and hyphens read as underscores. A response that names
/// no intent resolves to [`Intent::Retrieval`]. Only a blank response is
/// inconclusive.
#[must_use]
pub fn parse_llm_intent(response: &str) -> TierOutcome {
    let lower = response.trim().to_lowercase();
    if lower.is_empty() {
        return TierOutcome::Inconclusive;
    }

    let quoted = QUOTED.captures_iter(&lower).find_map(|caps| {
        let quoted = caps.get(1)?.as_str().trim();
        Intent::ALL
            .into_iter()
            .find(|intent| quoted.starts_with(intent.as_str()))
    });

    let intent = quoted
        .or_else(|| {
            Intent::ALL
                .into_iter()
                .find(|intent| lower.contains(intent.as_str()))
        })
        .or_else(|| {
            let (head, _) = lower.split_once(':')?;
            let head = head.trim().replace([' ', '-'], "_");
            Intent::ALL
                .into_iter()
                .find(|intent| head.contains(intent.as_str()))
        })
        .unwrap_or_else(|| {
            tracing::warn!(response = %response, "Classifier returned unrecognized intent");
            Intent::Retrieval
        });

    TierOutcome::Resolved(intent, DetectionSource::Llm)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent_of(response: &str) -> Option<Intent> {
        match parse_llm_intent(response) {
            TierOutcome::Resolved(intent, source) => {
                assert_eq!(source, DetectionSource::Llm);
                Some(intent)
            },
            TierOutcome::Inconclusive => None,
        }
    }

    #[test]
    fn test_quoted_prefix() {
        assert_eq!(
            intent_of(r#"I would classify this query as "comparison: two models""#),
            Some(Intent::Comparison)
        );
    }

    #[test]
    fn test_quoted_wins_over_earlier_substring() {
        assert_eq!(
            intent_of(r#"Not retrieval. Answer: "notebook""#),
            Some(Intent::Notebook)
        );
    }

    #[test]
    fn test_plain_substring() {
        assert_eq!(intent_of("Metadata"), Some(Intent::Metadata));
        assert_eq!(intent_of("category -> image_search"), Some(Intent::ImageSearch));
    }

    #[test]
    fn test_colon_head_with_spaces() {
        assert_eq!(
            intent_of("Image Search: the user wants pictures"),
            Some(Intent::ImageSearch)
        );
    }

    #[test]
    fn test_unrecognized_defaults_to_retrieval() {
        assert_eq!(intent_of("I am not sure"), Some(Intent::Retrieval));
    }

    #[test]
    fn test_blank_is_inconclusive() {
        assert_eq!(intent_of("  \n"), None);
    }
}
