//! Validated pipeline configuration and the form → config decoding pass.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::codec::{
    encode, NumberRule, NON_NEGATIVE_INT, POSITIVE_INT, PROBABILITY, UNIT_INTERVAL,
};
use super::form::{
    EarlyStopperForm, EvaluatorForm, GeneratorForm, ObjectiveForm, PipelineForm, PredictorForm,
    RunnerForm, SamplerForm, StrategyForm,
};
use crate::core::dataset::validate::AMINO_ACIDS;
use crate::core::issues::{FieldCode, ValidationErrors};

static WINDOW_SIZES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\s*,\s*\d+)*$").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineConfig {
    pub sampler: SamplerConfig,
    pub predictor: BTreeMap<String, PredictorConfig>,
    pub evaluator: BTreeMap<String, EvaluatorConfig>,
    pub generator: GeneratorConfig,
    pub early_stopper: EarlyStopperConfig,
    pub runner: RunnerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplerConfig {
    pub num_shuffles: u64,
    pub shuffle_rate: f64,
    pub window_sizes: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictorConfig {
    pub destruct_per_samples: u64,
    pub num_destructions: u64,
    pub mutate_per_samples: u64,
    pub num_mutations: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatorConfig {
    pub objective: Objective,
    pub series: Strategy,
    pub parallel: Strategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Objective {
    Minimize,
    Maximize,
    /// Target interval with `lower < upper`.
    Range { lower: f64, upper: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Strategy {
    TopP(f64),
    TopK(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratorConfig {
    pub max_new_token: u64,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EarlyStopperConfig {
    pub num_samples: u64,
    pub patience: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunnerConfig {
    pub num_iterations: u64,
    pub num_sequences: u64,
}

/// Records an issue for `path` when `raw` fails `rule`.
fn field(errors: &mut ValidationErrors, path: &[&str], raw: &str, rule: NumberRule) -> Option<f64> {
    match rule.check(raw) {
        Ok(value) => Some(value),
        Err(code) => {
            errors.push(path, code);
            None
        }
    }
}

fn count(errors: &mut ValidationErrors, path: &[&str], raw: &str, rule: NumberRule) -> Option<u64> {
    field(errors, path, raw, rule).map(|value| value as u64)
}

impl PipelineForm {
    /// Decode every field. All offending fields are reported, not just the
    /// first; per-column key membership is not checked here.
    pub fn validate(&self) -> Result<PipelineConfig, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let sampler = self.sampler.decode(&mut errors);

        let mut predictor = BTreeMap::new();
        for (column, entry) in &self.predictor {
            if let Some(decoded) = entry.decode(column, &mut errors) {
                predictor.insert(column.clone(), decoded);
            }
        }

        let mut evaluator = BTreeMap::new();
        for (column, entry) in &self.evaluator {
            if let Some(decoded) = entry.decode(column, &mut errors) {
                evaluator.insert(column.clone(), decoded);
            }
        }

        let generator = self.generator.decode(&mut errors);
        let early_stopper = self.early_stopper.decode(&mut errors);
        let runner = self.runner.decode(&mut errors);

        match (sampler, generator, early_stopper, runner) {
            (Some(sampler), Some(generator), Some(early_stopper), Some(runner))
                if errors.is_empty() =>
            {
                Ok(PipelineConfig {
                    sampler,
                    predictor,
                    evaluator,
                    generator,
                    early_stopper,
                    runner,
                })
            }
            _ => Err(errors),
        }
    }
}

impl SamplerForm {
    fn decode(&self, errors: &mut ValidationErrors) -> Option<SamplerConfig> {
        let num_shuffles = count(
            errors,
            &["sampler", "num_shuffles"],
            &self.num_shuffles,
            NON_NEGATIVE_INT,
        );
        let shuffle_rate = field(
            errors,
            &["sampler", "shuffle_rate"],
            &self.shuffle_rate,
            UNIT_INTERVAL,
        );
        let window_sizes = match parse_window_sizes(&self.window_sizes) {
            Ok(sizes) => Some(sizes),
            Err(code) => {
                errors.push(&["sampler", "window_sizes"], code);
                None
            }
        };

        Some(SamplerConfig {
            num_shuffles: num_shuffles?,
            shuffle_rate: shuffle_rate?,
            window_sizes: window_sizes?,
        })
    }
}

/// Comma-separated positive integers, e.g. `1, 3, 5`.
pub fn parse_window_sizes(raw: &str) -> Result<Vec<u64>, FieldCode> {
    if !WINDOW_SIZES.is_match(raw) {
        return Err(FieldCode::InvalidFormat);
    }

    let sizes = raw
        .split(',')
        .map(|part| part.trim().parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| FieldCode::InvalidType)?;

    if sizes.iter().any(|&size| size < 1) {
        return Err(FieldCode::TooSmall);
    }

    Ok(sizes)
}

impl PredictorForm {
    fn decode(&self, column: &str, errors: &mut ValidationErrors) -> Option<PredictorConfig> {
        let mut get = |name: &str, raw: &str| {
            count(errors, &["predictor", column, name], raw, NON_NEGATIVE_INT)
        };

        let destruct_per_samples = get("destruct_per_samples", &self.destruct_per_samples);
        let num_destructions = get("num_destructions", &self.num_destructions);
        let mutate_per_samples = get("mutate_per_samples", &self.mutate_per_samples);
        let num_mutations = get("num_mutations", &self.num_mutations);

        Some(PredictorConfig {
            destruct_per_samples: destruct_per_samples?,
            num_destructions: num_destructions?,
            mutate_per_samples: mutate_per_samples?,
            num_mutations: num_mutations?,
        })
    }
}

impl EvaluatorForm {
    fn decode(&self, column: &str, errors: &mut ValidationErrors) -> Option<EvaluatorConfig> {
        let objective = match &self.objective {
            ObjectiveForm::Min => Some(Objective::Minimize),
            ObjectiveForm::Max => Some(Objective::Maximize),
            ObjectiveForm::Range { lower, upper } => {
                let lower = field(
                    errors,
                    &["evaluator", column, "lower"],
                    lower,
                    NumberRule::number(),
                );
                let upper = field(
                    errors,
                    &["evaluator", column, "upper"],
                    upper,
                    NumberRule::number(),
                );
                match (lower, upper) {
                    (Some(lower), Some(upper)) if lower < upper => {
                        Some(Objective::Range { lower, upper })
                    }
                    (Some(_), Some(_)) => {
                        errors.push(&["evaluator", column, "upper"], FieldCode::InvalidRange);
                        None
                    }
                    _ => None,
                }
            }
        };

        let series = decode_strategy(&self.series, &["evaluator", column, "series"], errors);
        let parallel = decode_strategy(&self.parallel, &["evaluator", column, "parallel"], errors);

        Some(EvaluatorConfig {
            objective: objective?,
            series: series?,
            parallel: parallel?,
        })
    }
}

fn decode_strategy(
    strategy: &StrategyForm,
    prefix: &[&str],
    errors: &mut ValidationErrors,
) -> Option<Strategy> {
    let mut path = prefix.to_vec();
    match strategy {
        StrategyForm::TopP(raw) => {
            path.push("top_p");
            field(errors, &path, raw, PROBABILITY).map(Strategy::TopP)
        }
        StrategyForm::TopK(raw) => {
            path.push("top_k");
            count(errors, &path, raw, POSITIVE_INT).map(Strategy::TopK)
        }
    }
}

impl GeneratorForm {
    fn decode(&self, errors: &mut ValidationErrors) -> Option<GeneratorConfig> {
        let max_new_token = count(
            errors,
            &["generator", "max_new_token"],
            &self.max_new_token,
            NON_NEGATIVE_INT,
        );

        let prompt_valid = self.prompt.is_empty() || AMINO_ACIDS.is_match(&self.prompt);
        if !prompt_valid {
            errors.push(&["generator", "prompt"], FieldCode::InvalidFormat);
        }

        Some(GeneratorConfig {
            max_new_token: max_new_token?,
            prompt: prompt_valid.then(|| self.prompt.clone())?,
        })
    }
}

impl EarlyStopperForm {
    fn decode(&self, errors: &mut ValidationErrors) -> Option<EarlyStopperConfig> {
        let num_samples = count(
            errors,
            &["early_stopper", "num_samples"],
            &self.num_samples,
            POSITIVE_INT,
        );
        let patience = count(errors, &["early_stopper", "patience"], &self.patience, POSITIVE_INT);

        Some(EarlyStopperConfig {
            num_samples: num_samples?,
            patience: patience?,
        })
    }
}

impl RunnerForm {
    fn decode(&self, errors: &mut ValidationErrors) -> Option<RunnerConfig> {
        let num_iterations = count(
            errors,
            &["runner", "num_iterations"],
            &self.num_iterations,
            POSITIVE_INT,
        );
        let num_sequences = count(
            errors,
            &["runner", "num_sequences"],
            &self.num_sequences,
            POSITIVE_INT,
        );

        Some(RunnerConfig {
            num_iterations: num_iterations?,
            num_sequences: num_sequences?,
        })
    }
}

impl PipelineConfig {
    /// Re-encode into form values, e.g. for display or for the stored
    /// `config.json`.
    pub fn to_form(&self) -> PipelineForm {
        PipelineForm {
            sampler: SamplerForm {
                num_shuffles: self.sampler.num_shuffles.to_string(),
                shuffle_rate: encode(self.sampler.shuffle_rate),
                window_sizes: self
                    .sampler
                    .window_sizes
                    .iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            },
            predictor: self
                .predictor
                .iter()
                .map(|(column, entry)| {
                    (
                        column.clone(),
                        PredictorForm {
                            destruct_per_samples: entry.destruct_per_samples.to_string(),
                            num_destructions: entry.num_destructions.to_string(),
                            mutate_per_samples: entry.mutate_per_samples.to_string(),
                            num_mutations: entry.num_mutations.to_string(),
                        },
                    )
                })
                .collect(),
            evaluator: self
                .evaluator
                .iter()
                .map(|(column, entry)| (column.clone(), entry.to_form()))
                .collect(),
            generator: GeneratorForm {
                max_new_token: self.generator.max_new_token.to_string(),
                prompt: self.generator.prompt.clone(),
            },
            early_stopper: EarlyStopperForm {
                num_samples: self.early_stopper.num_samples.to_string(),
                patience: self.early_stopper.patience.to_string(),
            },
            runner: RunnerForm {
                num_iterations: self.runner.num_iterations.to_string(),
                num_sequences: self.runner.num_sequences.to_string(),
            },
        }
    }
}

impl EvaluatorConfig {
    fn to_form(&self) -> EvaluatorForm {
        let strategy = |strategy: &Strategy| match *strategy {
            Strategy::TopP(value) => StrategyForm::TopP(encode(value)),
            Strategy::TopK(value) => StrategyForm::TopK(value.to_string()),
        };

        EvaluatorForm {
            objective: match self.objective {
                Objective::Minimize => ObjectiveForm::Min,
                Objective::Maximize => ObjectiveForm::Max,
                Objective::Range { lower, upper } => ObjectiveForm::Range {
                    lower: encode(lower),
                    upper: encode(upper),
                },
            },
            series: strategy(&self.series),
            parallel: strategy(&self.parallel),
        }
    }
}
