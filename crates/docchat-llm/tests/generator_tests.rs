use std::path::PathBuf;

use docchat_core::config::Config;
use docchat_core::error::GeneratorError;
use docchat_llm::{default_generator, GeneratorConfig, LlamaGenerator};

#[test]
fn echo_generator_streams_the_context_section() {
    std::env::set_var("APP_USE_FAKE_GENERATOR", "1");
    let config = Config::load().expect("config");
    let generator = default_generator(&config).expect("generator");

    let prompt = "Use the following pieces of information.\n\n\
                  Context: The sky is blue.\n\
                  Question: What color is the sky?\n\n\
                  Helpful answer:\n";
    let mut pieces = Vec::new();
    let answer = generator
        .generate(prompt, &mut |piece| pieces.push(piece.to_string()))
        .expect("generate");

    assert_eq!(answer, "The sky is blue.");
    assert_eq!(pieces.concat(), answer, "callback pieces must concatenate to the answer");
    assert!(pieces.len() > 1, "answer must arrive incrementally");
}

#[test]
fn echo_generator_without_markers_echoes_everything() {
    std::env::set_var("APP_USE_FAKE_GENERATOR", "1");
    let config = Config::load().expect("config");
    let generator = default_generator(&config).expect("generator");

    let answer = generator.generate("just words", &mut |_| {}).expect("generate");
    assert_eq!(answer, "just words");
}

#[test]
fn missing_weights_are_a_load_time_error() {
    let config = GeneratorConfig {
        weights_path: PathBuf::from("/nonexistent/model.gguf"),
        tokenizer_path: PathBuf::from("/nonexistent/tokenizer.json"),
        max_new_tokens: 16,
        temperature: 0.3,
        context_length: 512,
        seed: 1,
    };
    let err = LlamaGenerator::new(config).expect_err("must not load");
    assert!(matches!(err, GeneratorError::ModelNotFound(_)));
}
