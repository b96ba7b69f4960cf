//! Fixed-topology Flux txt2img workflow with an adapter stack.
//!
//! ```text
//! UNETLoader 37 + DualCLIPLoader 39 -> adapter stack 40
//! stack.clip  -> CLIPTextEncode 6 (positive) -> FluxGuidance 38
//! stack.clip  -> CLIPTextEncode 33 (negative)
//! stack.model, 38, 33, EmptySD3LatentImage 27 -> KSampler 31
//! KSampler 31 + VAELoader 41 -> VAEDecode 8 -> SaveImage 9
//! ```

use crate::adapters::NONE_ADAPTER;
use crate::config::DEFAULT_SLOT_COUNT;
use crate::graph::{Node, RequestGraph};
use crate::request::GenerationRequest;

/// Node ids the remote worker's workflow was authored with.
pub mod nodes {
    use crate::graph::NodeId;

    pub const POSITIVE_PROMPT: NodeId = NodeId("6");
    pub const DECODE: NodeId = NodeId("8");
    pub const SAVE: NodeId = NodeId("9");
    pub const LATENT: NodeId = NodeId("27");
    pub const SAMPLER: NodeId = NodeId("31");
    pub const NEGATIVE_PROMPT: NodeId = NodeId("33");
    pub const DIFFUSION_MODEL: NodeId = NodeId("37");
    pub const GUIDANCE: NodeId = NodeId("38");
    pub const TEXT_ENCODERS: NodeId = NodeId("39");
    pub const ADAPTER_STACK: NodeId = NodeId("40");
    pub const VAE: NodeId = NodeId("41");
}

/// Model files and fixed sampler settings wired into the workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineModels {
    pub diffusion_model: String,
    pub weight_dtype: String,
    pub text_encoder_1: String,
    pub text_encoder_2: String,
    pub encoder_type: String,
    pub vae: String,
    pub sampler: String,
    pub scheduler: String,
    pub cfg: u32,
    pub denoise: u32,
    pub filename_prefix: String,
    /// Pairs the remote stack node declares. Requests with fewer slots are
    /// padded with disabled pairs up to this width.
    pub stack_width: usize,
}

impl Default for PipelineModels {
    /// Flux dev fp8, as installed on the reference worker.
    fn default() -> Self {
        Self {
            diffusion_model: "flux1-dev-fp8.safetensors".to_string(),
            weight_dtype: "default".to_string(),
            text_encoder_1: "clip_l.safetensors".to_string(),
            text_encoder_2: "t5xxl_fp8_e4m3fn.safetensors".to_string(),
            encoder_type: "flux".to_string(),
            vae: "ae.safetensors".to_string(),
            sampler: "euler".to_string(),
            scheduler: "simple".to_string(),
            cfg: 1,
            denoise: 1,
            filename_prefix: "ComfyUI".to_string(),
            stack_width: DEFAULT_SLOT_COUNT,
        }
    }
}

/// Input names of adapter slot `n` (1-based) on the stack node.
pub fn slot_input_names(n: usize) -> (String, String) {
    (format!("lora_{:02}", n), format!("strength_{:02}", n))
}

/// Build the request graph for `request`. Only literal leaves vary between calls.
pub fn build_workflow(request: &GenerationRequest, models: &PipelineModels) -> RequestGraph {
    use nodes::*;

    let mut stack = Node::new("Lora Loader Stack (rgthree)")
        .title("Lora Loader Stack (rgthree)")
        .link("model", DIFFUSION_MODEL, 0)
        .link("clip", TEXT_ENCODERS, 0);
    let slots = request.adapters();
    for (i, slot) in slots.iter().enumerate() {
        let (name_key, strength_key) = slot_input_names(i + 1);
        stack = stack
            .literal(name_key, slot.adapter.as_str())
            .literal(strength_key, slot.strength);
    }
    for n in slots.len() + 1..=models.stack_width {
        let (name_key, strength_key) = slot_input_names(n);
        stack = stack
            .literal(name_key, NONE_ADAPTER)
            .literal(strength_key, 0.0);
    }

    RequestGraph::from_nodes([
        (
            POSITIVE_PROMPT,
            Node::new("CLIPTextEncode")
                .title("CLIP Text Encode (Positive Prompt)")
                .literal("text", request.prompt.as_str())
                .link("clip", ADAPTER_STACK, 1),
        ),
        (
            DECODE,
            Node::new("VAEDecode")
                .title("VAE Decode")
                .link("samples", SAMPLER, 0)
                .link("vae", VAE, 0),
        ),
        (
            SAVE,
            Node::new("SaveImage")
                .title("Save Image")
                .literal("filename_prefix", models.filename_prefix.as_str())
                .link("images", DECODE, 0),
        ),
        (
            LATENT,
            Node::new("EmptySD3LatentImage")
                .title("EmptySD3LatentImage")
                .literal("width", request.width)
                .literal("height", request.height)
                .literal("batch_size", 1),
        ),
        (
            SAMPLER,
            Node::new("KSampler")
                .title("KSampler")
                .literal("seed", request.seed)
                .literal("steps", request.steps)
                .literal("cfg", models.cfg)
                .literal("sampler_name", models.sampler.as_str())
                .literal("scheduler", models.scheduler.as_str())
                .literal("denoise", models.denoise)
                .link("model", ADAPTER_STACK, 0)
                .link("positive", GUIDANCE, 0)
                .link("negative", NEGATIVE_PROMPT, 0)
                .link("latent_image", LATENT, 0),
        ),
        (
            NEGATIVE_PROMPT,
            Node::new("CLIPTextEncode")
                .title("CLIP Text Encode (Negative Prompt)")
                .literal("text", request.negative_prompt.as_str())
                .link("clip", ADAPTER_STACK, 1),
        ),
        (
            DIFFUSION_MODEL,
            Node::new("UNETLoader")
                .title("Load Diffusion Model")
                .literal("unet_name", models.diffusion_model.as_str())
                .literal("weight_dtype", models.weight_dtype.as_str()),
        ),
        (
            GUIDANCE,
            Node::new("FluxGuidance")
                .title("FluxGuidance")
                .literal("guidance", request.guidance)
                .link("conditioning", POSITIVE_PROMPT, 0),
        ),
        (
            TEXT_ENCODERS,
            Node::new("DualCLIPLoader")
                .title("DualCLIPLoader")
                .literal("clip_name1", models.text_encoder_1.as_str())
                .literal("clip_name2", models.text_encoder_2.as_str())
                .literal("type", models.encoder_type.as_str())
                .literal("device", "default"),
        ),
        (ADAPTER_STACK, stack),
        (
            VAE,
            Node::new("VAELoader")
                .title("Load VAE")
                .literal("vae_name", models.vae.as_str()),
        ),
    ])
}

/// Convenience for callers that only need the stack node's ordered pairs back.
pub fn adapter_pairs(graph: &RequestGraph) -> Vec<(String, f64)> {
    let Some(stack) = graph.node(nodes::ADAPTER_STACK) else {
        return Vec::new();
    };
    (1..)
        .map(slot_input_names)
        .map_while(|(name_key, strength_key)| {
            let name = stack.get(&name_key)?.as_literal()?.as_str()?.to_string();
            let strength = stack.get(&strength_key)?.as_literal()?.as_f64()?;
            Some((name, strength))
        })
        .collect()
}
