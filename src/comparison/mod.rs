//! Cross-model comparison.
//!
//! Pure functions over resolved [`ModelRecord`]s: metric rankings, pairwise
//! deltas, architecture grouping, size and complexity rankings, and parameter
//! efficiency. No I/O happens here.
//!
//! Each summary needs at least two models carrying the relevant view; with
//! fewer, the summary is [`Summary::Unavailable`] with an explanatory message
//! instead of an error.

use crate::models::ModelRecord;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Message returned when fewer than two models carry performance data.
pub const NOT_ENOUGH_PERFORMANCE: &str = "Not enough models with performance data for comparison";

/// Message returned when fewer than two models carry architecture data.
pub const NOT_ENOUGH_ARCHITECTURE: &str =
    "Not enough models with architecture data for comparison";

/// A summary, or a marker saying there was not enough data to build one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Summary<T> {
    /// The summary was computed.
    Available(T),
    /// Not enough data.
    Unavailable {
        /// Explanation.
        error: String,
    },
}

impl<T> Summary<T> {
    /// Returns the computed summary, if any.
    #[must_use]
    pub const fn available(&self) -> Option<&T> {
        match self {
            Self::Available(summary) => Some(summary),
            Self::Unavailable { .. } => None,
        }
    }

    fn unavailable(message: &str) -> Self {
        Self::Unavailable {
            error: message.to_string(),
        }
    }
}

/// One entry of a metric ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankEntry {
    /// Model identifier.
    pub model_id: String,
    /// Metric value.
    pub value: f64,
}

/// Best model plus the full ordering for one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRanking {
    /// Best entry.
    pub best: RankEntry,
    /// All entries, best first.
    pub ranking: Vec<RankEntry>,
}

/// Relative difference of one metric between two models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairDelta {
    /// `first - second`.
    pub absolute: f64,
    /// Difference as a percentage of the second model's value.
    pub percentage: f64,
    /// Whether the first model is better on this metric.
    pub better: bool,
}

/// Performance summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceComparison {
    /// Accuracy ranking, descending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<MetricRanking>,
    /// Loss ranking, ascending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss: Option<MetricRanking>,
    /// Perplexity ranking, ascending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perplexity: Option<MetricRanking>,
    /// `"{a}_vs_{b}"` to per-metric deltas, for every ordered pair.
    pub relative_improvement: BTreeMap<String, BTreeMap<String, PairDelta>>,
}

/// Parameter count entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeEntry {
    /// Model identifier.
    pub model_id: String,
    /// Total parameters (0 when the catalog does not say).
    pub parameters: u64,
}

/// Model size ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSizeComparison {
    /// Largest model.
    pub largest: SizeEntry,
    /// Smallest model.
    pub smallest: SizeEntry,
    /// All models, largest first.
    pub ranking: Vec<SizeEntry>,
    /// `"{a}_vs_{b}"` to `params(a) / params(b)`; pairs with a zero denominator are omitted.
    pub relative_sizes: BTreeMap<String, f64>,
}

/// Integer-valued ranking entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountEntry {
    /// Model identifier.
    pub model_id: String,
    /// Value.
    pub value: u64,
}

/// Ranking labelled most/least.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MostLeast {
    /// Highest value.
    pub most: CountEntry,
    /// Lowest value.
    pub least: CountEntry,
    /// All entries, highest first.
    pub ranking: Vec<CountEntry>,
}

/// Ranking labelled largest/smallest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LargestSmallest {
    /// Highest value.
    pub largest: CountEntry,
    /// Lowest value.
    pub smallest: CountEntry,
    /// All entries, highest first.
    pub ranking: Vec<CountEntry>,
}

/// Per-model complexity numbers (0 when missing).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ComplexityMetrics {
    /// Layer count.
    pub layers: u64,
    /// Attention head count.
    pub attention_heads: u64,
    /// Hidden dimension.
    pub hidden_size: u64,
}

/// Complexity rankings. A ranking is present only when every compared model
/// has a positive value for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComplexityComparisons {
    /// Layer ranking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layers: Option<MostLeast>,
    /// Attention head ranking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attention_heads: Option<MostLeast>,
    /// Hidden size ranking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden_size: Option<LargestSmallest>,
}

/// Complexity block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Complexity {
    /// Raw numbers per model.
    pub metrics: BTreeMap<String, ComplexityMetrics>,
    /// Rankings.
    pub comparisons: ComplexityComparisons,
}

/// Architecture summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchitectureComparison {
    /// Architecture type to model ids.
    pub architecture_types: BTreeMap<String, Vec<String>>,
    /// Size ranking.
    pub model_size: ModelSizeComparison,
    /// Complexity rankings.
    pub complexity: Complexity,
}

/// Parameter efficiency of one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Efficiency {
    /// `accuracy / (parameters / 1e6)`.
    pub accuracy_per_million_params: f64,
}

/// All summaries computed for a comparison request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonSummary {
    /// Performance summary, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<Summary<PerformanceComparison>>,
    /// Architecture summary, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<Summary<ArchitectureComparison>>,
    /// Efficiency, when every compared model qualifies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub efficiency: Option<BTreeMap<String, Efficiency>>,
}

/// Comparison results, organized by model and by dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonResults {
    /// Model id to record (including not-found stubs).
    pub models: BTreeMap<String, ModelRecord>,
    /// Dimension to model id to slice (`{}` when the model lacks it).
    pub dimensions: BTreeMap<String, BTreeMap<String, Value>>,
    /// Summaries.
    pub summary: ComparisonSummary,
}

impl ComparisonResults {
    /// Organizes resolved records and computes the requested summaries.
    ///
    /// `records` keeps request order; that order drives pair enumeration and
    /// tie-breaking in rankings.
    #[must_use]
    pub fn build(records: &[ModelRecord], dimensions: &[String]) -> Self {
        let models = records
            .iter()
            .map(|record| (record.model_id.clone(), record.clone()))
            .collect();

        let dimension_views = dimensions
            .iter()
            .map(|dimension| {
                let per_model = records
                    .iter()
                    .map(|record| (record.model_id.clone(), record.dimension(dimension)))
                    .collect();
                (dimension.clone(), per_model)
            })
            .collect();

        Self {
            models,
            dimensions: dimension_views,
            summary: summarize(records, dimensions),
        }
    }

    /// Number of resolved (found) models.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.models.values().filter(|record| record.found).count()
    }
}

/// Computes the summaries requested by `dimensions`.
#[must_use]
pub fn summarize(records: &[ModelRecord], dimensions: &[String]) -> ComparisonSummary {
    let wants = |name: &str| dimensions.iter().any(|d| d == name);
    let mut summary = ComparisonSummary::default();

    if wants("performance") {
        summary.performance = Some(compare_performance(records));
    }
    if wants("architecture") {
        let architecture = compare_architecture(records);
        if architecture.available().is_some() {
            summary.efficiency = efficiency(records);
        }
        summary.architecture = Some(architecture);
    }

    summary
}

/// Ranks accuracy, loss and perplexity and computes pairwise deltas.
#[must_use]
pub fn compare_performance(records: &[ModelRecord]) -> Summary<PerformanceComparison> {
    let with_perf: Vec<(&str, &crate::models::PerformanceView)> = records
        .iter()
        .filter(|record| record.found)
        .filter_map(|record| {
            record
                .performance
                .as_ref()
                .map(|perf| (record.model_id.as_str(), perf))
        })
        .collect();

    if with_perf.len() < 2 {
        return Summary::unavailable(NOT_ENOUGH_PERFORMANCE);
    }

    let collect = |pick: fn(&crate::models::PerformanceView) -> Option<f64>| -> Vec<RankEntry> {
        with_perf
            .iter()
            .filter_map(|(id, perf)| {
                pick(perf).map(|value| RankEntry {
                    model_id: (*id).to_string(),
                    value,
                })
            })
            .collect()
    };

    let mut comparison = PerformanceComparison {
        accuracy: rank(collect(|p| p.accuracy), true),
        loss: rank(collect(|p| p.loss), false),
        perplexity: rank(collect(|p| p.perplexity), false),
        relative_improvement: BTreeMap::new(),
    };

    for (i, (first_id, first)) in with_perf.iter().enumerate() {
        for (j, (second_id, second)) in with_perf.iter().enumerate() {
            if i == j {
                continue;
            }
            let mut deltas = BTreeMap::new();
            let metrics = [
                ("accuracy", first.accuracy, second.accuracy, true),
                ("loss", first.loss, second.loss, false),
                ("perplexity", first.perplexity, second.perplexity, false),
            ];
            for (name, a, b, higher_wins) in metrics {
                if let Some(delta) = pair_delta(a, b, higher_wins) {
                    deltas.insert(name.to_string(), delta);
                }
            }
            comparison
                .relative_improvement
                .insert(format!("{first_id}_vs_{second_id}"), deltas);
        }
    }

    Summary::Available(comparison)
}

fn rank(mut entries: Vec<RankEntry>, higher_wins: bool) -> Option<MetricRanking> {
    if higher_wins {
        entries.sort_by(|a, b| b.value.total_cmp(&a.value));
    } else {
        entries.sort_by(|a, b| a.value.total_cmp(&b.value));
    }
    let best = entries.first()?.clone();
    Some(MetricRanking {
        best,
        ranking: entries,
    })
}

fn pair_delta(first: Option<f64>, second: Option<f64>, higher_wins: bool) -> Option<PairDelta> {
    let (a, b) = (first?, second?);
    if b == 0.0 {
        return None;
    }
    Some(PairDelta {
        absolute: a - b,
        percentage: (a - b) / b * 100.0,
        better: if higher_wins { a > b } else { a < b },
    })
}

/// Groups by architecture type and ranks size and complexity.
#[must_use]
pub fn compare_architecture(records: &[ModelRecord]) -> Summary<ArchitectureComparison> {
    let with_arch: Vec<(&str, &crate::models::ArchitectureView)> = records
        .iter()
        .filter(|record| record.found)
        .filter_map(|record| {
            record
                .architecture
                .as_ref()
                .map(|arch| (record.model_id.as_str(), arch))
        })
        .collect();

    if with_arch.len() < 2 {
        return Summary::unavailable(NOT_ENOUGH_ARCHITECTURE);
    }

    let mut architecture_types: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (id, arch) in &with_arch {
        architecture_types
            .entry(arch.kind.clone())
            .or_default()
            .push((*id).to_string());
    }

    let mut sizes: Vec<SizeEntry> = with_arch
        .iter()
        .map(|(id, arch)| SizeEntry {
            model_id: (*id).to_string(),
            parameters: arch.total_parameters.unwrap_or(0),
        })
        .collect();
    sizes.sort_by(|a, b| b.parameters.cmp(&a.parameters));

    let mut relative_sizes = BTreeMap::new();
    for (i, first) in sizes.iter().enumerate() {
        for (j, second) in sizes.iter().enumerate() {
            if i == j || second.parameters == 0 {
                continue;
            }
            relative_sizes.insert(
                format!("{}_vs_{}", first.model_id, second.model_id),
                ratio(first.parameters, second.parameters),
            );
        }
    }

    let model_size = ModelSizeComparison {
        largest: sizes[0].clone(),
        smallest: sizes[sizes.len() - 1].clone(),
        ranking: sizes,
        relative_sizes,
    };

    let metrics: BTreeMap<String, ComplexityMetrics> = with_arch
        .iter()
        .map(|(id, arch)| {
            (
                (*id).to_string(),
                ComplexityMetrics {
                    layers: arch.num_layers.unwrap_or(0),
                    attention_heads: arch.num_attention_heads.unwrap_or(0),
                    hidden_size: arch.hidden_size.unwrap_or(0),
                },
            )
        })
        .collect();

    let ordered = |pick: fn(&ComplexityMetrics) -> u64| -> Option<Vec<CountEntry>> {
        let mut entries: Vec<CountEntry> = with_arch
            .iter()
            .map(|(id, _)| CountEntry {
                model_id: (*id).to_string(),
                value: metrics.get(*id).map_or(0, pick),
            })
            .collect();
        if entries.iter().any(|entry| entry.value == 0) {
            return None;
        }
        entries.sort_by(|a, b| b.value.cmp(&a.value));
        Some(entries)
    };

    let comparisons = ComplexityComparisons {
        layers: ordered(|m| m.layers).and_then(most_least),
        attention_heads: ordered(|m| m.attention_heads).and_then(most_least),
        hidden_size: ordered(|m| m.hidden_size).and_then(largest_smallest),
    };

    Summary::Available(ArchitectureComparison {
        architecture_types,
        model_size,
        complexity: Complexity {
            metrics,
            comparisons,
        },
    })
}

#[allow(clippy::cast_precision_loss)]
fn ratio(a: u64, b: u64) -> f64 {
    a as f64 / b as f64
}

fn most_least(ranking: Vec<CountEntry>) -> Option<MostLeast> {
    Some(MostLeast {
        most: ranking.first()?.clone(),
        least: ranking.last()?.clone(),
        ranking,
    })
}

fn largest_smallest(ranking: Vec<CountEntry>) -> Option<LargestSmallest> {
    Some(LargestSmallest {
        largest: ranking.first()?.clone(),
        smallest: ranking.last()?.clone(),
        ranking,
    })
}

/// Accuracy per million parameters.
///
/// Returns `None` unless every model with an architecture view has a positive
/// parameter count and a defined accuracy.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn efficiency(records: &[ModelRecord]) -> Option<BTreeMap<String, Efficiency>> {
    let candidates: Vec<&ModelRecord> = records
        .iter()
        .filter(|record| record.found && record.architecture.is_some())
        .collect();
    if candidates.len() < 2 {
        return None;
    }

    candidates
        .into_iter()
        .map(|record| {
            let params = record
                .architecture
                .as_ref()
                .and_then(|arch| arch.total_parameters)
                .filter(|p| *p > 0)?;
            let accuracy = record.performance.as_ref().and_then(|perf| perf.accuracy)?;
            Some((
                record.model_id.clone(),
                Efficiency {
                    accuracy_per_million_params: accuracy / (params as f64 / 1_000_000.0),
                },
            ))
        })
        .collect()
}
