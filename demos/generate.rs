//! Generate one image against a deployed endpoint and save it.
//!
//! Reads `RUNPOD_API_KEY` and `RUNPOD_ENDPOINT_ID` (or `RUNPOD_API_BASE`)
//! from the environment or a `.env` file.
//!
//! ```sh
//! RUST_LOG=runpod_comfy=debug cargo run --example generate -- "a bowl of curry"
//! ```

use runpod_comfy::{
    base_prompt, reconcile_prompt, AdapterCatalog, ClientConfig, GenerationRequest,
    RequestLimits, RunpodClient, NONE_ADAPTER,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ClientConfig::from_env()?;
    if config.api_key.is_none() {
        eprintln!("Please set your RUNPOD_API_KEY in the .env file");
        return Ok(());
    }
    let client = RunpodClient::new(config);

    let catalog = AdapterCatalog::reference();
    let limits = RequestLimits::default().with_slot_count(2);
    println!("Available adapters:");
    for adapter in catalog.iter() {
        println!("  {} \u{2014} {}", adapter.id, adapter.description);
    }

    let user_prompt = std::env::args().nth(1).unwrap_or_else(|| {
        "product photography of a bowl on wooden table in cozy thai kitchen".to_string()
    });
    let previous = [NONE_ADAPTER, NONE_ADAPTER];
    let selected = ["Benjarong_flux_v1.safetensors", NONE_ADAPTER];
    let prompt = reconcile_prompt(&user_prompt, &selected, &previous, &catalog);
    println!("Prompt: {}", prompt);
    println!("Base prompt: {}", base_prompt(&prompt, &selected, &catalog));

    let request = GenerationRequest::with_slot_count(prompt, limits.slot_count)
        .adapters_from(selected.iter().map(|id| (*id, 1.0)))
        .size(1024, 1024)
        .steps(20)
        .randomize_seed();
    request.validate(&limits, &catalog)?;
    println!("Seed: {}", request.seed);

    let image = client
        .generate(&request, |state| {
            println!("[{:>3.0}%] {}", state.progress() * 100.0, state.label())
        })
        .await?;

    let filename = format!("generated_{}.{}", request.seed, image.extension());
    std::fs::write(&filename, &image.bytes)?;
    println!("Saved {}x{} image to {}", image.width(), image.height(), filename);

    Ok(())
}
