/// Maps text to a fixed-length vector. Stateless and deterministic for a
/// given model; the dimension is constant for the provider's lifetime.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Blocking, callback-streaming generation.
///
/// `on_token` is invoked once per produced token piece, in generation
/// order, and the call returns the full answer text only after
/// generation completes. Streaming happens through the callback, not
/// through an incremental return.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str, on_token: &mut dyn FnMut(&str)) -> anyhow::Result<String>;
}
