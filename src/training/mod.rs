//! Training data and the model fitting pipeline

pub mod dataset;
pub mod evaluation;
pub mod pipeline;
pub mod synthetic;

pub use dataset::{stratified_split, Dataset, LabeledRecord};
pub use pipeline::TrainingPipeline;
pub use synthetic::SyntheticDataGenerator;
