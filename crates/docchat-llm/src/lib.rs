//! Answer generation: a blocking, callback-streaming quantized llama
//! runner and an echo fallback for model-free environments.

use anyhow::{anyhow, Result};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use candle_core::quantized::gguf_file;
use candle_core::{Device, Tensor};
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::quantized_llama::ModelWeights;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use docchat_core::config::{expand_path, Config};
use docchat_core::error::GeneratorError;
use docchat_core::traits::Generator;

/// Generation limits, fixed at model load time. These are pass-through
/// caps, not tuning knobs the query path can vary.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub weights_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub max_new_tokens: usize,
    pub temperature: f64,
    pub context_length: usize,
    pub seed: u64,
}

impl GeneratorConfig {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            weights_path: expand_path(&config.get::<String>("llm.weights_path")?),
            tokenizer_path: expand_path(&config.get::<String>("llm.tokenizer_path")?),
            max_new_tokens: config.get_or("llm.max_new_tokens", 2048),
            temperature: config.get_or("llm.temperature", 0.3),
            context_length: config.get_or("llm.context_length", 4096),
            seed: config.get_or("llm.seed", 299_792_458),
        })
    }
}

/// Llama-family GGUF model on CPU.
///
/// `generate` is blocking and CPU-bound. The forward pass needs `&mut`
/// (the KV cache lives in the weights), so one handle serializes
/// concurrent calls behind a mutex; calls never share per-query state.
#[derive(Debug)]
pub struct LlamaGenerator {
    model: Mutex<ModelWeights>,
    tokenizer: Tokenizer,
    config: GeneratorConfig,
    device: Device,
    eos_token: u32,
}

impl LlamaGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self, GeneratorError> {
        if !config.weights_path.exists() {
            return Err(GeneratorError::ModelNotFound(config.weights_path.clone()));
        }
        let device = Device::Cpu;
        info!(path = %config.weights_path.display(), "loading GGUF weights");
        let mut file =
            File::open(&config.weights_path).map_err(|e| GeneratorError::Load(e.to_string()))?;
        let content =
            gguf_file::Content::read(&mut file).map_err(|e| GeneratorError::Load(e.to_string()))?;
        let model = ModelWeights::from_gguf(content, &mut file, &device)
            .map_err(|e| GeneratorError::Load(e.to_string()))?;
        let tokenizer = Tokenizer::from_file(&config.tokenizer_path)
            .map_err(|e| GeneratorError::Load(e.to_string()))?;
        let eos_token = tokenizer.token_to_id("</s>").unwrap_or(2);
        info!("generation model ready");
        Ok(Self { model: Mutex::new(model), tokenizer, config, device, eos_token })
    }

    fn run(&self, prompt: &str, on_token: &mut dyn FnMut(&str)) -> Result<String> {
        let enc = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| anyhow!("prompt tokenization failed: {}", e))?;
        let mut tokens: Vec<u32> = enc.get_ids().to_vec();
        let budget = self.config.context_length.saturating_sub(self.config.max_new_tokens);
        if budget > 0 && tokens.len() > budget {
            // Keep the tail: the question sits at the end of the template.
            tokens = tokens[tokens.len() - budget..].to_vec();
        }
        debug!(prompt_tokens = tokens.len(), "starting generation");

        let mut model = self.model.lock().map_err(|_| anyhow!("generator mutex poisoned"))?;
        let mut logits_processor =
            LogitsProcessor::new(self.config.seed, Some(self.config.temperature), None);

        // One pass over the whole prompt, then token by token.
        let input = Tensor::new(tokens.as_slice(), &self.device)?.unsqueeze(0)?;
        let logits = model.forward(&input, 0)?.squeeze(0)?;
        let mut next = logits_processor.sample(&logits)?;

        let mut generated: Vec<u32> = Vec::new();
        let mut emitted = String::new();
        let mut index_pos = tokens.len();
        for _ in 0..self.config.max_new_tokens {
            if next == self.eos_token {
                break;
            }
            generated.push(next);
            let decoded = self
                .tokenizer
                .decode(&generated, true)
                .map_err(|e| anyhow!("detokenization failed: {}", e))?;
            // Hold back while the tail is an incomplete multi-byte
            // sequence; the next token completes it.
            if decoded.len() > emitted.len()
                && decoded.is_char_boundary(emitted.len())
                && !decoded.ends_with('\u{fffd}')
            {
                let piece = decoded[emitted.len()..].to_string();
                on_token(&piece);
                emitted = decoded;
            }

            let input = Tensor::new(&[next], &self.device)?.unsqueeze(0)?;
            let logits = model.forward(&input, index_pos)?.squeeze(0)?;
            next = logits_processor.sample(&logits)?;
            index_pos += 1;
        }

        let answer = self
            .tokenizer
            .decode(&generated, true)
            .map_err(|e| anyhow!("detokenization failed: {}", e))?;
        debug!(new_tokens = generated.len(), "generation finished");
        Ok(answer)
    }
}

impl Generator for LlamaGenerator {
    fn generate(&self, prompt: &str, on_token: &mut dyn FnMut(&str)) -> Result<String> {
        self.run(prompt, on_token)
            .map_err(|e| GeneratorError::Generation(e.to_string()).into())
    }
}

/// Streams the context section of the prompt back word by word. Selected
/// by `APP_USE_FAKE_GENERATOR` so the full pipeline runs without model
/// weights; the "answer" is whatever retrieval put into the context.
struct EchoGenerator;

impl Generator for EchoGenerator {
    fn generate(&self, prompt: &str, on_token: &mut dyn FnMut(&str)) -> Result<String> {
        let context = prompt
            .split("Context:")
            .nth(1)
            .and_then(|rest| rest.split("Question:").next())
            .unwrap_or(prompt)
            .trim();
        let mut answer = String::new();
        for word in context.split_whitespace() {
            let piece =
                if answer.is_empty() { word.to_string() } else { format!(" {word}") };
            on_token(&piece);
            answer.push_str(&piece);
        }
        Ok(answer)
    }
}

/// Build the deployment's generator. `APP_USE_FAKE_GENERATOR=1` selects
/// the echo fallback; otherwise the GGUF weights must resolve and load.
pub fn default_generator(config: &Config) -> Result<Box<dyn Generator>> {
    let use_fake = std::env::var("APP_USE_FAKE_GENERATOR")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake {
        info!("using echo generator");
        return Ok(Box::new(EchoGenerator));
    }
    Ok(Box::new(LlamaGenerator::new(GeneratorConfig::from_config(config)?)?))
}
