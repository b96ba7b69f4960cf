//! # runpod-comfy
//!
//! Async Rust client for serverless [ComfyUI](https://github.com/comfyanonymous/ComfyUI)
//! workers behind a queue-based `/run` + `/status` API.
//!
//! Builds a fixed-topology Flux workflow with a stack of style adapters,
//! submits it, polls the job under a wall-clock deadline while riding out
//! transient status errors, and decodes the base64 image the worker returns.
//!
//! ## Quick Start
//!
//! ```no_run
//! use runpod_comfy::{
//!     AdapterCatalog, ClientConfig, GenerationRequest, RequestLimits, RunpodClient,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RunpodClient::new(ClientConfig::from_env()?);
//!
//! let request = GenerationRequest::new("a ceramic bowl on a wooden table")
//!     .size(1024, 768)
//!     .steps(20)
//!     .adapter("Benjarong_flux_v1.safetensors", 1.0);
//! request.validate(&RequestLimits::default(), &AdapterCatalog::reference())?;
//!
//! let image = client
//!     .generate(&request, |state| println!("{:.0}% {}", state.progress() * 100.0, state.label()))
//!     .await?;
//! image.image.save("bowl.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! The stages can also be driven one by one:
//!
//! ```no_run
//! use runpod_comfy::{build_workflow, decode, ClientConfig, GenerationRequest, JobOutcome,
//!     PipelineModels, RunpodClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RunpodClient::new(ClientConfig::from_env()?);
//! let graph = build_workflow(&GenerationRequest::new("a cat"), &PipelineModels::default());
//! let mut job = client.submit(&graph).await?;
//! if let JobOutcome::Completed(envelope) = client.wait(&mut job, |_| {}).await {
//!     let image = decode(&envelope)?;
//!     println!("{}x{}", image.width(), image.height());
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod graph;
pub mod poller;
pub mod prompt;
pub mod request;
pub mod types;
pub mod workflow;

pub use adapters::{AdapterCatalog, StyleAdapter, NONE_ADAPTER};
pub use client::RunpodClient;
pub use config::{ClientConfig, PollConfig, RequestLimits};
pub use decode::{decode, DecodedImage};
pub use error::{
    ConfigError, DecodeError, GenerateError, GraphError, PollError, Result, SubmissionError,
    ValidationError,
};
pub use graph::{Input, Node, NodeId, RequestGraph};
pub use poller::{Poller, StatusSource};
pub use prompt::{base_prompt, reconcile_prompt};
pub use request::{AdapterSlot, AdapterSlots, GenerationRequest};
pub use types::{Job, JobId, JobOutcome, JobState, StatusReport};
pub use workflow::{build_workflow, PipelineModels};
