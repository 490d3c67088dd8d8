//! Rule-based extraction of the parameters every intent shares.

use crate::models::{ModelIds, SortOrder, SortSpec};
use crate::query::nlp::{STOP_WORDS, entities};
use crate::query::patterns::{
    FILTER_SIGNALS, FilterKind, LIMIT, METRIC, MODEL_FAMILIES, MODEL_ID, SORT,
};
use serde_json::{Map, Value, json};

/// Words that follow "model" without naming one.
const GENERIC_WORDS: &[&str] = &[
    "id", "ids", "name", "names", "type", "types", "family", "families", "card", "cards",
    "version", "versions", "size", "sizes", "performance", "accuracy", "loss", "perplexity",
    "architecture", "architectures", "metadata", "details", "information", "info", "data",
    "weights", "training",
];

/// Collects model mentions: explicit `model X` ids, entity spans and model
/// family keywords. All lowercase, in order of first mention.
///
/// A family match inside a longer family match or inside an explicit or
/// entity mention is dropped, so `stable-diffusion` does not also yield
/// `diffusion`. `clip` directly followed by `score` is the metric, not the
/// model.
#[must_use]
pub fn model_mentions(text: &str) -> ModelIds {
    let lower = text.to_lowercase();
    let mut anchors: Vec<(usize, String)> = Vec::new();

    for caps in MODEL_ID.captures_iter(&lower) {
        let Some(found) = caps.get(2) else {
            continue;
        };
        let id = found.as_str().trim_end_matches(['.', '-', '_']);
        if id.is_empty() || STOP_WORDS.contains(id) || GENERIC_WORDS.contains(&id) {
            continue;
        }
        anchors.push((found.start(), id.to_string()));
    }

    for entity in entities(text) {
        let entity = entity.to_lowercase();
        let start = lower.find(&entity).unwrap_or(lower.len());
        anchors.push((start, entity));
    }

    let mut family_matches: Vec<(usize, usize)> = MODEL_FAMILIES
        .iter()
        .flat_map(|family| family.find_iter(&lower))
        .filter(|m| !is_clip_score(&lower, m.as_str(), m.end()))
        .map(|m| (m.start(), m.end()))
        .collect();
    family_matches.sort_by(|a, b| (b.1 - b.0).cmp(&(a.1 - a.0)).then(a.0.cmp(&b.0)));

    let mut accepted: Vec<(usize, usize)> = Vec::new();
    let mut mentions = anchors.clone();
    for (start, end) in family_matches {
        if accepted.iter().any(|&(s, e)| start < e && s < end) {
            continue;
        }
        let family = &lower[start..end];
        let inside_anchor = anchors
            .iter()
            .any(|(_, anchor)| anchor.len() > family.len() && anchor.contains(family));
        accepted.push((start, end));
        if !inside_anchor {
            mentions.push((start, family.to_string()));
        }
    }

    mentions.sort_by_key(|(start, _)| *start);
    mentions.into_iter().map(|(_, id)| id).collect()
}

fn is_clip_score(lower: &str, matched: &str, end: usize) -> bool {
    matched == "clip"
        && lower[end..]
            .trim_start_matches(['-', '_'])
            .starts_with("score")
}

/// Metrics in first-occurrence order, deduplicated. `clip_score` and
/// `clipscore` are reported as `clip-score`.
#[must_use]
pub fn metrics(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for caps in METRIC.captures_iter(text) {
        let Some(metric) = caps.get(1) else {
            continue;
        };
        let metric = metric.as_str().to_lowercase();
        let metric = if metric.starts_with("clip") {
            "clip-score".to_string()
        } else {
            metric
        };
        if !found.contains(&metric) {
            found.push(metric);
        }
    }
    found
}

/// Filters keyed by kind: `architecture`, `framework`, `params` and `date`.
///
/// Parameter-count and date filters are structured comparisons
/// (`{operator, value}` and `{field, operator, value}`); the operator keeps
/// its surface form and is normalized when the filter is translated.
#[must_use]
pub fn filters(text: &str) -> Map<String, Value> {
    let mut filters = Map::new();

    for signal in FILTER_SIGNALS.iter() {
        for caps in signal.pattern.captures_iter(text) {
            let group = |i: usize| caps.get(i).map(|m| normalize_space(m.as_str()));
            match signal.kind {
                FilterKind::Architecture => {
                    if let Some(value) = group(1) {
                        filters.insert("architecture".to_string(), Value::String(value));
                    }
                },
                FilterKind::Framework => {
                    if let Some(value) = group(1) {
                        filters.insert("framework".to_string(), Value::String(value));
                    }
                },
                FilterKind::ParameterCount => {
                    let (Some(operator), Some(raw)) = (group(1), group(2)) else {
                        continue;
                    };
                    let Some(value) = parse_quantity(&raw) else {
                        tracing::debug!(value = %raw, "Unparseable parameter count");
                        continue;
                    };
                    filters.insert(
                        "params".to_string(),
                        json!({ "operator": operator, "value": value }),
                    );
                },
                FilterKind::Date => {
                    let (Some(field), Some(operator), Some(value)) = (group(1), group(2), group(3))
                    else {
                        continue;
                    };
                    let field = if field == "created" {
                        "creation_date"
                    } else {
                        "last_modified_date"
                    };
                    filters.insert(
                        "date".to_string(),
                        json!({ "field": field, "operator": operator, "value": value }),
                    );
                },
            }
        }
    }

    filters
}

fn normalize_space(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Parses a parameter count with an optional `k`/`m`/`b`/`t` suffix.
///
/// `7b` is 7,000,000,000 and `1.5k` is 1,500. Fractions finer than one unit
/// are truncated.
#[must_use]
pub fn parse_quantity(raw: &str) -> Option<u64> {
    let lower = raw.trim().to_lowercase();
    let (number, multiplier) = match lower.chars().last()? {
        'k' => (&lower[..lower.len() - 1], 1_000_u64),
        'm' => (&lower[..lower.len() - 1], 1_000_000),
        'b' => (&lower[..lower.len() - 1], 1_000_000_000),
        't' => (&lower[..lower.len() - 1], 1_000_000_000_000),
        _ => (lower.as_str(), 1),
    };

    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut value = whole.parse::<u64>().ok()?.checked_mul(multiplier)?;

    let mut scale = multiplier;
    for digit in fraction.chars().filter_map(|c| c.to_digit(10)) {
        scale /= 10;
        if scale == 0 {
            break;
        }
        value = value.checked_add(u64::from(digit) * scale)?;
    }
    Some(value)
}

/// First `limit/top/first N` with a positive `N`.
#[must_use]
pub fn limit(text: &str) -> Option<usize> {
    LIMIT
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<usize>().ok())
        .filter(|n| *n > 0)
}

/// `sort/order by FIELD [order]`, descending unless stated.
#[must_use]
pub fn sort(text: &str) -> Option<SortSpec> {
    let caps = SORT.captures(text)?;
    let field = caps.get(1)?.as_str().to_lowercase();
    let order = caps
        .get(2)
        .and_then(|m| SortOrder::parse(m.as_str()))
        .unwrap_or_default();
    Some(SortSpec::new(field, order))
}
