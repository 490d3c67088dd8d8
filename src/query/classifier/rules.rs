//! Rule tier: ordered pattern sets.

use super::TierOutcome;
use crate::models::{DetectionSource, Intent};
use crate::query::extractor::model_mentions;
use crate::query::patterns::matches_intent;

/// Intents tested after the comparison check, in priority order.
const PRIORITY: [Intent; 3] = [Intent::Notebook, Intent::ImageSearch, Intent::Metadata];

/// Classifies `text` with the pattern library.
///
/// Two or more distinct model mentions plus a comparison pattern always
/// means [`Intent::Comparison`]. Otherwise the first matching intent in
/// [`PRIORITY`] wins, then retrieval if a retrieval pattern matches or any
/// model is mentioned.
#[must_use]
pub fn classify(text: &str) -> TierOutcome {
    let lower = text.to_lowercase();
    let mentions = model_mentions(text);

    if mentions.len() > 1 && matches_intent(&lower, Intent::Comparison) {
        return TierOutcome::Resolved(Intent::Comparison, DetectionSource::Rules);
    }

    if let Some(intent) = PRIORITY
        .into_iter()
        .find(|intent| matches_intent(&lower, *intent))
    {
        return TierOutcome::Resolved(intent, DetectionSource::Rules);
    }

    if matches_intent(&lower, Intent::Retrieval) || !mentions.is_empty() {
        return TierOutcome::Resolved(Intent::Retrieval, DetectionSource::Rules);
    }

    TierOutcome::Inconclusive
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
    fn test_comparison_precedence_over_image() {
        assert_eq!(
            intent_of("show images comparing stable-diffusion vs dall-e"),
            Some(Intent::Comparison)
        );
    }

    #[test]
    fn test_comparison_needs_two_models() {
        assert_eq!(
            intent_of("compare the accuracy of bert"),
            Some(Intent::Retrieval)
        );
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(
            intent_of("generate a notebook to show images"),
            Some(Intent::Notebook)
        );
        assert_eq!(
            intent_of("find images with metadata"),
            Some(Intent::ImageSearch)
        );
        assert_eq!(
            intent_of("list the metadata fields"),
            Some(Intent::Metadata)
        );
    }

    #[test]
    fn test_model_mention_alone_is_retrieval() {
        assert_eq!(intent_of("resnet-50"), Some(Intent::Retrieval));
    }

    #[test]
    fn test_nothing_is_inconclusive() {
        assert_eq!(intent_of("hello there"), None);
    }
}
