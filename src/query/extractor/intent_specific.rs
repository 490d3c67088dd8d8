//! Extraction layered on top of the common rules for comparison, notebook
//! and image-search queries.

use crate::models::{ParameterBag, Resolution};
use crate::query::patterns::{
    ANALYSIS, COMPARISON_DIMENSIONS, DATASET, IMAGE_FIELD_LABEL, LIST_SEPARATOR, PROMPT,
    RESOLUTION, RESOURCES, STYLE, VISUALIZE,
};
use regex::Regex;

/// Words that end a captured list phrase.
const CONNECTORS: &[&str] = &[
    " using ", " with ", " on ", " for ", " by ", " of ", " from ", " in ", " at ",
];

/// Connectors that end a prompt phrase. Prompts keep `on`/`of`/`in`.
const PROMPT_CONNECTORS: &[&str] = &[" using ", " with ", " by ", " from "];

/// Truncates `phrase` at the first connector word.
fn cut_at_connectors<'a>(phrase: &'a str, connectors: &[&str]) -> &'a str {
    let end = connectors
        .iter()
        .filter_map(|connector| phrase.find(connector))
        .min()
        .unwrap_or(phrase.len());
    phrase[..end].trim()
}

/// Truncates an image-search phrase where the next field label starts.
fn cut_at_label(phrase: &str) -> &str {
    IMAGE_FIELD_LABEL
        .find_iter(phrase)
        .find(|m| m.start() > 0)
        .map_or(phrase, |m| &phrase[..m.start()])
        .trim()
}

fn capture<'a>(pattern: &Regex, text: &'a str) -> Option<&'a str> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Splits a phrase on commas and `and`, trimming and dropping empties.
fn split_list(phrase: &str) -> Vec<String> {
    LIST_SEPARATOR
        .split(phrase)
        .map(|part| part.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|part| !part.is_empty())
        .collect()
}

/// Comparison dimensions and the visualization flag.
pub fn comparison(text: &str, bag: &mut ParameterBag) {
    let lower = text.to_lowercase();
    if let Some(phrase) = capture(&COMPARISON_DIMENSIONS, &lower) {
        bag.comparison_dimensions = split_list(cut_at_connectors(phrase, CONNECTORS));
    }
    if VISUALIZE.is_match(&lower) {
        bag.visualize = Some(true);
    }
}

/// Analysis types, dataset and resource hint.
pub fn notebook(text: &str, bag: &mut ParameterBag) {
    let lower = text.to_lowercase();
    if let Some(phrase) = capture(&ANALYSIS, &lower) {
        bag.analysis_types = split_list(cut_at_connectors(phrase, CONNECTORS));
    }
    if let Some(phrase) = capture(&DATASET, &lower) {
        let dataset = cut_at_connectors(phrase, CONNECTORS);
        if !dataset.is_empty() {
            bag.dataset = Some(dataset.to_string());
        }
    }
    if let Some(phrase) = capture(&RESOURCES, &lower) {
        let resources = phrase.trim();
        if !resources.is_empty() {
            bag.resources = Some(resources.to_string());
        }
    }
}

/// Prompt terms, style tags and resolution.
pub fn image(text: &str, bag: &mut ParameterBag) {
    let lower = text.to_lowercase();
    if let Some(phrase) = capture(&PROMPT, &lower) {
        let prompt = cut_at_connectors(cut_at_label(phrase), PROMPT_CONNECTORS);
        if !prompt.is_empty() {
            bag.prompt_terms = Some(prompt.to_string());
        }
    }
    if let Some(phrase) = capture(&STYLE, &lower) {
        bag.style_tags = split_list(cut_at_connectors(cut_at_label(phrase), CONNECTORS));
    }
    if let Some(caps) = RESOLUTION.captures(&lower) {
        let width = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let height = caps.get(2).and_then(|m| m.as_str().parse().ok());
        if let (Some(width), Some(height)) = (width, height) {
            if width > 0 && height > 0 {
                bag.resolution = Some(Resolution { width, height });
            }
        }
    }
}
