//! Fleet execution model

pub mod executor;
pub mod report;
pub mod step;

pub use executor::{FleetExecutor, FleetOptions};
pub use report::{publish_all, ConsoleSink, ResultSink};
pub use step::{maintenance_pipeline, prepare_pipeline, Pipeline, Step, StepContext, StepFn};
