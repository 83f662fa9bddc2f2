//! tiktoken-backed token counting

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chatbench_core::{CharEstimateCounter, TokenCounter};
use tiktoken_rs::CoreBPE;

/// Counts tokens with the tiktoken encoding of the requested model.
///
/// Unknown models use `cl100k_base`. If no encoding can be built at all the
/// count falls back to [`CharEstimateCounter`]. Encoders are built on first
/// use and shared across every later call.
#[derive(Default)]
pub struct TiktokenCounter {
    encoders: Mutex<HashMap<String, Option<Arc<CoreBPE>>>>,
}

impl TiktokenCounter {
    /// Create a counter with an empty encoder cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a counter with the encoder for `model` already built.
    pub fn for_model(model: &str) -> Self {
        let counter = Self::new();
        counter.encoder(model);
        counter
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, Option<Arc<CoreBPE>>>> {
        self.encoders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn encoder(&self, model: &str) -> Option<Arc<CoreBPE>> {
        if let Some(cached) = self.cache().get(model) {
            return cached.clone();
        }

        // Build outside the lock; the first insert for a model is kept
        let loaded = load_encoder(model);
        self.cache()
            .entry(model.to_string())
            .or_insert(loaded)
            .clone()
    }
}

fn load_encoder(model: &str) -> Option<Arc<CoreBPE>> {
    let bpe = tiktoken_rs::get_bpe_from_model(model).or_else(|_| {
        tracing::debug!(model, "No tiktoken encoding for model, using cl100k_base");
        tiktoken_rs::cl100k_base()
    });

    match bpe {
        Ok(bpe) => Some(Arc::new(bpe)),
        Err(err) => {
            tracing::warn!(model, error = %err, "Failed to load tiktoken encoding, estimating tokens");
            None
        }
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str, model: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        match self.encoder(model) {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => CharEstimateCounter.count(text, model),
        }
    }
}

impl std::fmt::Debug for TiktokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self.encoders.lock().map(|e| e.len()).unwrap_or_default();
        f.debug_struct("TiktokenCounter")
            .field("cached_models", &cached)
            .finish()
    }
}
