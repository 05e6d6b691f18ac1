//! Recurrent sequence backend
//!
//! Text is tokenized with a word-level tokenizer, padded or truncated to a
//! fixed length, embedded and run through an LSTM (optionally with a second,
//! backward-reading LSTM). The final hidden states feed an optional dense
//! ReLU layer and an output layer. A single output unit is read as a sigmoid
//! probability of class 1; more units are read as class logits.

use crate::artifacts::{ArtifactStore, DeviceType};
use crate::classifier::{
    argmax, sigmoid, softmax, BackendKind, ClassificationMetadata, ClassificationResult,
    Classifier,
};
use crate::labels::LabelDecoder;
use candle_core::{DType, Device, Tensor};
use candle_nn::rnn::{LSTMConfig, LSTM, RNN};
use candle_nn::{Embedding, Linear, Module, VarBuilder};
use revsense_core::{Error, Result, SentimentLabel};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tokenizers::Tokenizer;
use tracing::info;

/// Which end of the sequence padding or truncation applies to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadSide {
    Pre,
    #[default]
    Post,
}

/// Exported network hyper-parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceModelConfig {
    /// Fixed input length
    #[serde(default = "default_max_len")]
    pub max_len: usize,

    /// Rows in the embedding table; token ids at or above are dropped
    pub vocab_size: usize,

    pub embedding_dim: usize,

    pub hidden_dim: usize,

    /// Width of the dense ReLU layer between the LSTM and the output layer
    #[serde(default)]
    pub dense_dim: Option<usize>,

    /// Output units: 1 for a sigmoid head, otherwise one per class
    pub num_outputs: usize,

    #[serde(default)]
    pub bidirectional: bool,

    #[serde(default)]
    pub padding: PadSide,

    #[serde(default)]
    pub truncating: PadSide,

    #[serde(default)]
    pub pad_id: u32,
}

fn default_max_len() -> usize {
    200
}

impl SequenceModelConfig {
    fn validate(&self, backend: &str) -> Result<()> {
        if self.max_len == 0 {
            return Err(Error::startup(backend, "max_len must be positive"));
        }
        if self.vocab_size == 0 || self.embedding_dim == 0 || self.hidden_dim == 0 {
            return Err(Error::startup(
                backend,
                "vocab_size, embedding_dim and hidden_dim must be positive",
            ));
        }
        if self.num_outputs == 0 {
            return Err(Error::startup(backend, "num_outputs must be positive"));
        }
        if self.pad_id as usize >= self.vocab_size {
            return Err(Error::startup(
                backend,
                format!("pad_id {} is outside the vocabulary", self.pad_id),
            ));
        }
        Ok(())
    }

    /// Number of classes the output layer encodes
    pub fn classes(&self) -> usize {
        if self.num_outputs == 1 {
            2
        } else {
            self.num_outputs
        }
    }

    /// Pad or truncate token ids to `max_len`
    pub fn fit_length(&self, mut ids: Vec<u32>) -> Vec<u32> {
        if ids.len() > self.max_len {
            let excess = ids.len() - self.max_len;
            match self.truncating {
                PadSide::Post => ids.truncate(self.max_len),
                PadSide::Pre => {
                    ids.drain(..excess);
                }
            }
        }

        let missing = self.max_len - ids.len();
        if missing > 0 {
            match self.padding {
                PadSide::Post => ids.extend(std::iter::repeat(self.pad_id).take(missing)),
                PadSide::Pre => {
                    let mut padded = vec![self.pad_id; missing];
                    padded.extend(ids);
                    ids = padded;
                }
            }
        }
        ids
    }
}

struct SequenceNetwork {
    embedding: Embedding,
    forward: LSTM,
    backward: Option<LSTM>,
    dense: Option<Linear>,
    output: Linear,
}

impl SequenceNetwork {
    fn load(config: &SequenceModelConfig, vb: VarBuilder) -> candle_core::Result<Self> {
        let embedding =
            candle_nn::embedding(config.vocab_size, config.embedding_dim, vb.pp("embedding"))?;
        let forward = candle_nn::lstm(
            config.embedding_dim,
            config.hidden_dim,
            LSTMConfig::default(),
            vb.pp("lstm"),
        )?;
        let backward = if config.bidirectional {
            Some(candle_nn::lstm(
                config.embedding_dim,
                config.hidden_dim,
                LSTMConfig::default(),
                vb.pp("lstm_backward"),
            )?)
        } else {
            None
        };

        let mut features = if config.bidirectional {
            2 * config.hidden_dim
        } else {
            config.hidden_dim
        };
        let dense = match config.dense_dim {
            Some(width) => {
                let layer = candle_nn::linear(features, width, vb.pp("dense"))?;
                features = width;
                Some(layer)
            }
            None => None,
        };
        let output = candle_nn::linear(features, config.num_outputs, vb.pp("output"))?;

        Ok(Self {
            embedding,
            forward,
            backward,
            dense,
            output,
        })
    }

    /// Final hidden state of `lstm` over an embedded `(1, len, dim)` input
    fn last_hidden(lstm: &LSTM, embedded: &Tensor) -> candle_core::Result<Tensor> {
        let states = lstm.seq(embedded)?;
        match states.last() {
            Some(state) => Ok(state.h().clone()),
            None => candle_core::bail!("empty input sequence"),
        }
    }

    fn forward(&self, ids: &[u32], device: &Device) -> candle_core::Result<Vec<f32>> {
        let input = Tensor::new(ids, device)?.unsqueeze(0)?;
        let mut hidden = Self::last_hidden(&self.forward, &self.embedding.forward(&input)?)?;

        if let Some(backward) = &self.backward {
            let reversed: Vec<u32> = ids.iter().rev().copied().collect();
            let input = Tensor::new(reversed.as_slice(), device)?.unsqueeze(0)?;
            let back = Self::last_hidden(backward, &self.embedding.forward(&input)?)?;
            hidden = Tensor::cat(&[&hidden, &back], 1)?;
        }

        if let Some(dense) = &self.dense {
            hidden = dense.forward(&hidden)?.relu()?;
        }

        self.output.forward(&hidden)?.squeeze(0)?.to_vec1::<f32>()
    }
}

pub struct SequenceClassifier {
    name: String,
    tokenizer: Tokenizer,
    config: SequenceModelConfig,
    network: SequenceNetwork,
    device: Device,
    labels: LabelDecoder,
}

impl SequenceClassifier {
    /// Load tokenizer, hyper-parameters, weights and label decoder
    pub fn from_artifacts(
        store: &ArtifactStore,
        weights: &Path,
        tokenizer: &Path,
        config: &Path,
        labels: &Path,
        device: DeviceType,
    ) -> Result<Self> {
        let name = store.backend();

        let config: SequenceModelConfig = store.read_json(config)?;
        config.validate(name)?;

        let classes: Vec<String> = store.read_json(labels)?;
        let labels = LabelDecoder::from_classes(name, &classes)?;
        labels.expect_classes(name, config.classes())?;

        let tokenizer_path = store.resolve(tokenizer)?;
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::startup(name, format!("failed to load tokenizer: {e}")))?;

        let device = create_device(name, device)?;
        let weights_path = store.resolve(weights)?;
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                .map_err(|e| Error::startup(name, format!("failed to load weights: {e}")))?
        };
        let network = SequenceNetwork::load(&config, vb)
            .map_err(|e| Error::startup(name, format!("weights do not match config: {e}")))?;

        info!(
            backend = name,
            max_len = config.max_len,
            bidirectional = config.bidirectional,
            classes = labels.len(),
            "loaded sequence model"
        );

        Ok(Self {
            name: name.to_string(),
            tokenizer,
            config,
            network,
            device,
            labels,
        })
    }

    /// Token ids for `text`, filtered to the embedding table and fitted to `max_len`
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| Error::classifier(format!("tokenization failed: {e}")))?;

        let ids = encoding
            .get_ids()
            .iter()
            .copied()
            .filter(|id| (*id as usize) < self.config.vocab_size)
            .collect();
        Ok(self.config.fit_length(ids))
    }
}

impl Classifier for SequenceClassifier {
    fn classify(&self, text: &str) -> Result<ClassificationResult> {
        let start = Instant::now();

        let ids = self.encode(text)?;
        let outputs = self
            .network
            .forward(&ids, &self.device)
            .map_err(|e| Error::classifier(format!("forward pass failed: {e}")))?;
        let outputs: Vec<f64> = outputs.into_iter().map(f64::from).collect();

        let (index, scores) = if let [logit] = outputs.as_slice() {
            let p = sigmoid(*logit);
            (usize::from(p > 0.5), vec![1.0 - p, p])
        } else {
            let probabilities = softmax(&outputs);
            let index = argmax(&probabilities)
                .ok_or_else(|| Error::classifier("sequence model produced no outputs"))?;
            (index, probabilities)
        };

        Ok(ClassificationResult {
            label: self.labels.decode(index)?,
            score: scores[index] as f32,
            metadata: ClassificationMetadata {
                backend: Some(self.name.clone()),
                all_scores: Some(self.labels.zip_scores(&scores)),
                ..Default::default()
            },
            latency_us: start.elapsed().as_micros() as u64,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Sequence
    }

    fn labels(&self) -> &[SentimentLabel] {
        self.labels.labels()
    }
}

/// Create Candle device from device type
fn create_device(backend: &str, device_type: DeviceType) -> Result<Device> {
    match device_type {
        DeviceType::Cpu => Ok(Device::Cpu),
        DeviceType::Cuda(idx) => Device::new_cuda(idx)
            .map_err(|e| Error::startup(backend, format!("failed to create CUDA device: {e}"))),
        DeviceType::Metal(idx) => Device::new_metal(idx)
            .map_err(|e| Error::startup(backend, format!("failed to create Metal device: {e}"))),
    }
}
