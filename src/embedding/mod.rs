use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
}

/// Interface implemented by embedding backends.
///
/// The store adapter embeds chunk text and query text through this seam, so a hosted
/// provider can replace the default local encoder without touching the pipeline.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce one embedding vector per supplied text.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Deterministic local embedding client.
///
/// Folds the input bytes into a fixed-dimension vector with an FNV-style mixer and
/// normalizes the result. Identical text always maps to the identical vector, which keeps
/// ingestion and search reproducible without an external model.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Construct an encoder emitting vectors of the given dimensionality.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];
        if text.is_empty() {
            return vector;
        }

        let mut state: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in text.bytes() {
            state ^= u64::from(byte);
            state = state.wrapping_mul(0x0000_0100_0000_01b3);
            let slot = (state % self.dimension as u64) as usize;
            // Spread the hash state into [-1, 1] before accumulating.
            vector[slot] += ((state >> 32) as f32 / u32::MAX as f32) * 2.0 - 1.0;
        }

        let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }

        vector
    }
}

#[async_trait]
impl EmbeddingClient for HashEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if self.dimension == 0 {
            return Err(EmbeddingError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        if texts.is_empty() {
            return Err(EmbeddingError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        Ok(texts.iter().map(|text| self.encode(text)).collect())
    }
}

/// Build the embedding client configured for this process.
pub fn get_embedding_client() -> Box<dyn EmbeddingClient + Send + Sync> {
    let dimension = crate::config::get_config().embedding_dimension;
    Box::new(HashEmbedder::new(dimension))
}
