//! Fitted statistical models and the artifact that bundles them

pub mod artifact;
pub mod isolation_forest;
pub mod random_forest;
pub mod scaler;
pub mod store;

pub use artifact::{ModelArtifact, ModelMetrics, ModelVersion};
pub use isolation_forest::IsolationForest;
pub use random_forest::RandomForestClassifier;
pub use scaler::StandardScaler;
pub use store::ModelStore;
