//! Form-layer pipeline configuration.
//!
//! Everything numeric is kept as the text the user typed; decoding happens in
//! [`PipelineForm::validate`](super::config). `predictor` and `evaluator` are
//! keyed by value-column name and follow the dataset through
//! [`PipelineForm::apply_column_diff`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::codec::{encode, string_or_number};
use crate::core::columns::ColumnDiff;
use crate::core::dataset::ColumnStats;

/// Seed value when a strategy is switched to `top_p`.
pub const DEFAULT_TOP_P: &str = "0.9";
/// Seed value when a strategy is switched to `top_k`.
pub const DEFAULT_TOP_K: &str = "20";
/// Range bounds used when no column statistics are available.
pub const FALLBACK_RANGE: (&str, &str) = ("0", "1");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineForm {
    pub sampler: SamplerForm,
    pub predictor: BTreeMap<String, PredictorForm>,
    pub evaluator: BTreeMap<String, EvaluatorForm>,
    pub generator: GeneratorForm,
    pub early_stopper: EarlyStopperForm,
    pub runner: RunnerForm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerForm {
    #[serde(deserialize_with = "string_or_number")]
    pub num_shuffles: String,
    #[serde(deserialize_with = "string_or_number")]
    pub shuffle_rate: String,
    pub window_sizes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorForm {
    #[serde(deserialize_with = "string_or_number")]
    pub destruct_per_samples: String,
    #[serde(deserialize_with = "string_or_number")]
    pub num_destructions: String,
    #[serde(deserialize_with = "string_or_number")]
    pub mutate_per_samples: String,
    #[serde(deserialize_with = "string_or_number")]
    pub num_mutations: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorForm {
    #[serde(flatten)]
    pub objective: ObjectiveForm,
    pub series: StrategyForm,
    pub parallel: StrategyForm,
}

/// Optimization direction for one value column, tagged on `mode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ObjectiveForm {
    Min,
    Max,
    Range {
        #[serde(deserialize_with = "string_or_number")]
        lower: String,
        #[serde(deserialize_with = "string_or_number")]
        upper: String,
    },
}

/// Candidate selection strategy, serialized as `{"top_p": ..}` or `{"top_k": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StrategyForm {
    #[serde(rename = "top_p")]
    TopP(#[serde(deserialize_with = "string_or_number")] String),
    #[serde(rename = "top_k")]
    TopK(#[serde(deserialize_with = "string_or_number")] String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorForm {
    #[serde(deserialize_with = "string_or_number")]
    pub max_new_token: String,
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarlyStopperForm {
    #[serde(deserialize_with = "string_or_number")]
    pub num_samples: String,
    #[serde(deserialize_with = "string_or_number")]
    pub patience: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerForm {
    #[serde(deserialize_with = "string_or_number")]
    pub num_iterations: String,
    #[serde(deserialize_with = "string_or_number")]
    pub num_sequences: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveKind {
    Min,
    Max,
    Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    TopP,
    TopK,
}

/// Which of the two strategy selections of an evaluator entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategySlot {
    Series,
    Parallel,
}

impl StrategySlot {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategySlot::Series => "series",
            StrategySlot::Parallel => "parallel",
        }
    }
}

impl Default for PipelineForm {
    fn default() -> Self {
        Self {
            sampler: SamplerForm::default(),
            predictor: BTreeMap::new(),
            evaluator: BTreeMap::new(),
            generator: GeneratorForm::default(),
            early_stopper: EarlyStopperForm::default(),
            runner: RunnerForm::default(),
        }
    }
}

impl Default for SamplerForm {
    fn default() -> Self {
        Self {
            num_shuffles: "100000".into(),
            shuffle_rate: "0.04".into(),
            window_sizes: "1, 3, 5".into(),
        }
    }
}

impl Default for PredictorForm {
    fn default() -> Self {
        Self {
            destruct_per_samples: "1".into(),
            num_destructions: "2".into(),
            mutate_per_samples: "1".into(),
            num_mutations: "2".into(),
        }
    }
}

impl Default for EvaluatorForm {
    fn default() -> Self {
        Self {
            objective: ObjectiveForm::Max,
            series: StrategyForm::TopP(DEFAULT_TOP_P.into()),
            parallel: StrategyForm::TopK(DEFAULT_TOP_K.into()),
        }
    }
}

impl Default for GeneratorForm {
    fn default() -> Self {
        Self {
            max_new_token: "256".into(),
            prompt: String::new(),
        }
    }
}

impl Default for EarlyStopperForm {
    fn default() -> Self {
        Self {
            num_samples: "1000".into(),
            patience: "10".into(),
        }
    }
}

impl Default for RunnerForm {
    fn default() -> Self {
        Self {
            num_iterations: "30".into(),
            num_sequences: "30000".into(),
        }
    }
}

impl PipelineForm {
    /// Defaults with one predictor/evaluator entry per column.
    pub fn for_columns(columns: &[String]) -> Self {
        let mut form = Self::default();
        form.sync_columns(columns);
        form
    }

    /// Drop entries for removed columns and seed defaults for added ones.
    /// Entries for surviving columns keep their edits.
    pub fn apply_column_diff(&mut self, diff: &ColumnDiff) {
        for column in &diff.removed {
            self.predictor.remove(column);
            self.evaluator.remove(column);
        }
        for column in &diff.added {
            self.predictor.entry(column.clone()).or_default();
            self.evaluator.entry(column.clone()).or_default();
        }
    }

    /// Make the per-column key sets exactly `columns`, keeping any existing
    /// entry whose column is still present. Used after loading a stored form.
    pub fn sync_columns(&mut self, columns: &[String]) {
        self.predictor.retain(|key, _| columns.contains(key));
        self.evaluator.retain(|key, _| columns.contains(key));
        for column in columns {
            self.predictor.entry(column.clone()).or_default();
            self.evaluator.entry(column.clone()).or_default();
        }
    }

    /// Whether both per-column maps are keyed by exactly `columns`.
    pub fn keys_match(&self, columns: &[String]) -> bool {
        let same = |keys: Vec<&String>| {
            keys.len() == columns.len() && columns.iter().all(|column| keys.contains(&column))
        };
        same(self.predictor.keys().collect()) && same(self.evaluator.keys().collect())
    }
}

impl ObjectiveForm {
    pub fn kind(&self) -> ObjectiveKind {
        match self {
            ObjectiveForm::Min => ObjectiveKind::Min,
            ObjectiveForm::Max => ObjectiveKind::Max,
            ObjectiveForm::Range { .. } => ObjectiveKind::Range,
        }
    }

    /// Select another objective. `range` is seeded from the column's min/max
    /// so the bounds start out valid; reselecting the current kind keeps its
    /// values.
    pub fn switch_to(&mut self, kind: ObjectiveKind, stats: Option<&ColumnStats>) {
        if self.kind() == kind {
            return;
        }
        *self = match kind {
            ObjectiveKind::Min => ObjectiveForm::Min,
            ObjectiveKind::Max => ObjectiveForm::Max,
            ObjectiveKind::Range => match stats {
                Some(stats) if stats.min < stats.max => ObjectiveForm::Range {
                    lower: encode(stats.min),
                    upper: encode(stats.max),
                },
                _ => ObjectiveForm::Range {
                    lower: FALLBACK_RANGE.0.into(),
                    upper: FALLBACK_RANGE.1.into(),
                },
            },
        };
    }
}

impl StrategyForm {
    pub fn kind(&self) -> StrategyKind {
        match self {
            StrategyForm::TopP(_) => StrategyKind::TopP,
            StrategyForm::TopK(_) => StrategyKind::TopK,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            StrategyForm::TopP(value) | StrategyForm::TopK(value) => value,
        }
    }

    /// Select another strategy, replacing the old value with that strategy's
    /// default rather than carrying it across.
    pub fn switch_to(&mut self, kind: StrategyKind) {
        if self.kind() == kind {
            return;
        }
        *self = match kind {
            StrategyKind::TopP => StrategyForm::TopP(DEFAULT_TOP_P.into()),
            StrategyKind::TopK => StrategyForm::TopK(DEFAULT_TOP_K.into()),
        };
    }
}

impl EvaluatorForm {
    pub fn strategy(&self, slot: StrategySlot) -> &StrategyForm {
        match slot {
            StrategySlot::Series => &self.series,
            StrategySlot::Parallel => &self.parallel,
        }
    }

    pub fn strategy_mut(&mut self, slot: StrategySlot) -> &mut StrategyForm {
        match slot {
            StrategySlot::Series => &mut self.series,
            StrategySlot::Parallel => &mut self.parallel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::columns::ColumnDiffTracker;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn column_diff_drives_entry_lifecycle() {
        let mut tracker = ColumnDiffTracker::new();
        let mut form = PipelineForm::default();

        let first = columns(&["a", "b"]);
        form.apply_column_diff(&tracker.diff(&first));
        assert!(form.keys_match(&first));

        form.predictor.get_mut("b").unwrap().num_mutations = "7".into();

        let second = columns(&["b", "c"]);
        form.apply_column_diff(&tracker.diff(&second));
        assert!(form.keys_match(&second));
        assert_eq!(form.predictor["b"].num_mutations, "7");
        assert_eq!(form.predictor["c"], PredictorForm::default());
        assert!(!form.evaluator.contains_key("a"));
    }

    #[test]
    fn sync_columns_keeps_surviving_entries() {
        let mut form = PipelineForm::for_columns(&columns(&["x", "y"]));
        form.evaluator.get_mut("x").unwrap().objective = ObjectiveForm::Min;
        form.sync_columns(&columns(&["x", "z"]));
        assert!(form.keys_match(&columns(&["x", "z"])));
        assert_eq!(form.evaluator["x"].objective, ObjectiveForm::Min);
    }

    #[test]
    fn strategy_switch_seeds_documented_defaults() {
        let mut strategy = StrategyForm::TopP("0.5".into());
        strategy.switch_to(StrategyKind::TopK);
        assert_eq!(strategy, StrategyForm::TopK("20".into()));
        strategy.switch_to(StrategyKind::TopK);
        assert_eq!(strategy, StrategyForm::TopK("20".into()));
        strategy.switch_to(StrategyKind::TopP);
        assert_eq!(strategy, StrategyForm::TopP("0.9".into()));
    }

    #[test]
    fn objective_switch_uses_column_stats() {
        let stats = ColumnStats {
            min: -1.5,
            max: 4.0,
            mean: 1.0,
            median: 1.0,
        };
        let mut objective = ObjectiveForm::Max;
        objective.switch_to(ObjectiveKind::Range, Some(&stats));
        assert_eq!(
            objective,
            ObjectiveForm::Range {
                lower: "-1.5".into(),
                upper: "4".into()
            }
        );

        let mut fallback = ObjectiveForm::Min;
        fallback.switch_to(ObjectiveKind::Range, None);
        assert_eq!(
            fallback,
            ObjectiveForm::Range {
                lower: "0".into(),
                upper: "1".into()
            }
        );

        objective.switch_to(ObjectiveKind::Min, Some(&stats));
        assert_eq!(objective, ObjectiveForm::Min);
    }

    #[test]
    fn json_shape() {
        let form = PipelineForm::for_columns(&columns(&["value1"]));
        let json = serde_json::to_value(&form).unwrap();
        assert_eq!(json["evaluator"]["value1"]["mode"], "max");
        assert_eq!(json["evaluator"]["value1"]["series"]["top_p"], "0.9");
        assert_eq!(json["evaluator"]["value1"]["parallel"]["top_k"], "20");
        assert_eq!(json["sampler"]["window_sizes"], "1, 3, 5");
    }

    #[test]
    fn deserializes_numbers_and_strings() {
        let json = r#"{
            "sampler": {"num_shuffles": 10, "shuffle_rate": "0.5", "window_sizes": "2"},
            "predictor": {"v": {"destruct_per_samples": 1, "num_destructions": 2,
                                "mutate_per_samples": 1, "num_mutations": 2}},
            "evaluator": {"v": {"mode": "range", "lower": 1, "upper": "2.5",
                                "series": {"top_k": 5}, "parallel": {"top_p": 0.5}}},
            "generator": {"max_new_token": 64, "prompt": "ACD"},
            "early_stopper": {"num_samples": 5, "patience": 2},
            "runner": {"num_iterations": 3, "num_sequences": 4}
        }"#;
        let form: PipelineForm = serde_json::from_str(json).unwrap();
        assert_eq!(form.sampler.num_shuffles, "10");
        assert_eq!(
            form.evaluator["v"].objective,
            ObjectiveForm::Range {
                lower: "1".into(),
                upper: "2.5".into()
            }
        );
        assert_eq!(form.evaluator["v"].series, StrategyForm::TopK("5".into()));
        assert_eq!(form.evaluator["v"].parallel, StrategyForm::TopP("0.5".into()));
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let form: PipelineForm = serde_json::from_str(
            r#"{"runner": {"num_iterations": "5", "num_sequences": "6"}}"#,
        )
        .unwrap();
        assert_eq!(form.sampler, SamplerForm::default());
        assert_eq!(form.runner.num_iterations, "5");
    }
}
