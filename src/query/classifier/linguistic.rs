//! Linguistic tier: verb/noun heuristics.

use super::TierOutcome;
use crate::models::{DetectionSource, Intent};
use crate::query::nlp::verbs_and_nouns;
use crate::query::patterns::{
    COMPARISON_VERBS, IMAGE_NOUNS, METADATA_NOUNS, MODEL_NOUNS, NOTEBOOK_NOUNS,
};

const VOCABULARIES: [(&[&str], Intent); 4] = [
    (NOTEBOOK_NOUNS, Intent::Notebook),
    (IMAGE_NOUNS, Intent::ImageSearch),
    (METADATA_NOUNS, Intent::Metadata),
    (MODEL_NOUNS, Intent::Retrieval),
];

/// Classifies `text` from its verbs and nouns.
#[must_use]
pub fn classify(text: &str) -> TierOutcome {
    let (verbs, nouns) = verbs_and_nouns(text);

    if nouns.len() > 1 && COMPARISON_VERBS.iter().any(|verb| verbs.contains(*verb)) {
        return TierOutcome::Resolved(Intent::Comparison, DetectionSource::Linguistic);
    }

    VOCABULARIES
        .iter()
        .find(|(vocabulary, _)| vocabulary.iter().any(|noun| nouns.contains(*noun)))
        .map_or(TierOutcome::Inconclusive, |(_, intent)| {
            TierOutcome::Resolved(*intent, DetectionSource::Linguistic)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent_of(text: &str) -> Option<Intent> {
        match classify(text) {
            TierOutcome::Resolved(intent, _) => Some(intent),
            TierOutcome::Inconclusive => None,
        }
    }

    #[test]
    fn test_comparison_verb_with_nouns() {
        assert_eq!(
            intent_of("contrast convolution layers and attention heads"),
            Some(Intent::Comparison)
        );
    }

    #[test]
    fn test_comparison_verb_single_noun_falls_through() {
        assert_eq!(intent_of("evaluate everything"), None);
    }

    #[test]
    fn test_vocabulary_order() {
        assert_eq!(intent_of("any script or image"), Some(Intent::Notebook));
        assert_eq!(intent_of("any renders of cats"), Some(Intent::ImageSearch));
        assert_eq!(intent_of("record attributes"), Some(Intent::Metadata));
        assert_eq!(intent_of("neural network stuff"), Some(Intent::Retrieval));
    }

    #[test]
    fn test_nothing_matches() {
        assert_eq!(intent_of("good morning"), None);
    }
}
