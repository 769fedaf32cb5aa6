//! Tour of the client: single text, batches, semantic weight, async, errors.
//!
//! ```sh
//! NEURALEX_API_KEY=nlx_... RUST_LOG=neuralex=debug cargo run --example basic_usage
//! ```

use anyhow::Result;
use neuralex::{ClientConfig, EmbedOptions, NeuralexError, blocking};
use tracing_subscriber::EnvFilter;

fn basic_example(config: &ClientConfig) -> Result<()> {
    println!("=== Basic Example ===");
    let client = blocking::Client::new(config.clone())?;

    let response = client.embed("Hello, world!", &EmbedOptions::default())?;
    let first = &response.payload[0];
    println!("Model: {}", response.model);
    println!("Dimensions: {}", first.dimensions());
    println!("First 5 values: {:?}", &first.embedding[..first.dimensions().min(5)]);
    println!("Tokens used: {}", response.total_usage.total_tokens);

    client.close();
    Ok(())
}

fn batch_example(config: &ClientConfig) -> Result<()> {
    println!("\n=== Batch Example ===");
    let client = blocking::Client::new(config.clone())?;

    let texts = [
        "Machine learning is fascinating",
        "Rust is a great programming language",
        "Vector embeddings enable semantic search",
    ];
    let response = client.embed(texts, &EmbedOptions::default())?;

    for (i, item) in response.payload.iter().enumerate() {
        println!("\nText {}: {}", i + 1, item.text);
        println!("Dimensions: {}", item.dimensions());
        println!("Tokens: {}", item.usage.total_tokens);
    }
    Ok(())
}

fn semantic_weight_example(config: &ClientConfig) -> Result<()> {
    println!("\n=== Semantic Weight Example ===");
    let client = blocking::Client::new(config.clone())?;
    let text = "Rust programming language";

    for (label, weight) in [("Term-focused", 0.2), ("Balanced", 0.5), ("Semantic-focused", 0.8)] {
        let options = EmbedOptions::new().with_semantic_weight(weight);
        let response = client.embed(text, &options)?;
        let vector = &response.payload[0].embedding;
        println!("{label} ({weight}): {:?}", &vector[..vector.len().min(3)]);
    }
    Ok(())
}

async fn async_example(config: ClientConfig) -> Result<()> {
    println!("\n=== Async Example ===");
    let client = neuralex::Client::new(config)?;

    let response = client
        .embed(vec!["Text 1", "Text 2", "Text 3"], &EmbedOptions::default())
        .await?;
    for item in &response.payload {
        println!("{}: {} dimensions", item.text, item.dimensions());
    }
    Ok(())
}

fn error_handling_example(config: &ClientConfig) {
    println!("\n=== Error Handling Example ===");
    let bad = config.clone().with_api_key("invalid_key");

    let outcome =
        blocking::Client::new(bad).and_then(|c| c.embed("Test", &EmbedOptions::default()));
    match outcome {
        Ok(_) => println!("Unexpectedly succeeded"),
        Err(err @ NeuralexError::Authentication { .. }) => println!("Authentication error: {err}"),
        Err(err @ NeuralexError::Api { status, .. }) => {
            println!("API error: {err} (status: {status})")
        }
        Err(err) => println!("Unexpected error: {err}"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ClientConfig::from_env()?;

    basic_example(&config)?;
    batch_example(&config)?;
    semantic_weight_example(&config)?;
    error_handling_example(&config);

    tokio::runtime::Runtime::new()?.block_on(async_example(config))
}
