//! Optimization pipeline configuration: the editable form, the number codec
//! that bridges text inputs and typed values, and the validated config.

pub mod codec;
pub mod config;
pub mod form;

pub use config::{
    EarlyStopperConfig, EvaluatorConfig, GeneratorConfig, Objective, PipelineConfig,
    PredictorConfig, RunnerConfig, SamplerConfig, Strategy,
};
pub use form::{
    EvaluatorForm, ObjectiveForm, ObjectiveKind, PipelineForm, PredictorForm, StrategyForm,
    StrategyKind, StrategySlot,
};
