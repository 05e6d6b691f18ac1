//! revsense Classifiers
//!
//! Interchangeable sentiment backends behind a single [`Classifier`] trait:
//! - Naive Bayes and linear max-margin models over TF-IDF features
//! - A recurrent sequence model run with Candle (`ml-models` feature)
//! - A zero-artifact keyword lexicon
//!
//! Backends are loaded once from pre-trained artifacts into a
//! [`ClassifierRegistry`] and are read-only afterwards.

pub mod artifacts;
pub mod classifier;
pub mod config;
pub mod labels;
pub mod lexicon;
pub mod linear_svm;
pub mod naive_bayes;
pub mod registry;
#[cfg(feature = "ml-models")]
pub mod sequence;
pub mod vectorizer;

pub use artifacts::{ArtifactSource, ArtifactStore, DeviceType};
pub use classifier::{BackendKind, ClassificationMetadata, ClassificationResult, Classifier};
pub use config::{BackendSpec, ClassifierConfig, DeviceSpec, SourceSpec};
pub use labels::LabelDecoder;
pub use lexicon::LexiconClassifier;
pub use linear_svm::{LinearSvmClassifier, LinearSvmParams};
pub use naive_bayes::{NaiveBayesClassifier, NaiveBayesParams};
pub use registry::{load_backend, load_config, ClassifierRegistry, InitReport, SharedRegistry};
#[cfg(feature = "ml-models")]
pub use sequence::{PadSide, SequenceClassifier, SequenceModelConfig};
pub use vectorizer::{Norm, TfidfVectorizer, VectorizerState};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{ClassificationResult, Classifier};
    pub use crate::config::ClassifierConfig;
    pub use crate::lexicon::LexiconClassifier;
    pub use crate::registry::{ClassifierRegistry, SharedRegistry};
}
