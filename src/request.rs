use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::adapters::{AdapterCatalog, NONE_ADAPTER};
use crate::config::{RequestLimits, DEFAULT_SLOT_COUNT};
use crate::error::ValidationError;

pub const DEFAULT_NEGATIVE_PROMPT: &str = "bad quality, low quality, bad image, lowres";
pub const DEFAULT_SEED: u64 = 173_805_153_958_730;

/// One (adapter, strength) pair in the adapter stack.
///
/// Deserialization goes through [`AdapterSlot::new`], so a stored `"None"`
/// slot always comes back at strength 0.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAdapterSlot")]
pub struct AdapterSlot {
    pub adapter: String,
    pub strength: f64,
}

#[derive(Deserialize)]
struct RawAdapterSlot {
    adapter: String,
    strength: f64,
}

impl From<RawAdapterSlot> for AdapterSlot {
    fn from(raw: RawAdapterSlot) -> Self {
        AdapterSlot::new(raw.adapter, raw.strength)
    }
}

impl AdapterSlot {
    /// A slot for `adapter`. Selecting the `"None"` sentinel forces strength 0.0.
    pub fn new(adapter: impl Into<String>, strength: f64) -> Self {
        let adapter = adapter.into();
        let strength = if adapter == NONE_ADAPTER { 0.0 } else { strength };
        Self { adapter, strength }
    }

    pub fn disabled() -> Self {
        Self {
            adapter: NONE_ADAPTER.to_string(),
            strength: 0.0,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.adapter == NONE_ADAPTER
    }
}

/// Exactly `count` adapter slots, padded with disabled slots or truncated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterSlots {
    slots: Vec<AdapterSlot>,
}

impl AdapterSlots {
    pub fn new(count: usize, slots: impl IntoIterator<Item = AdapterSlot>) -> Self {
        let mut slots: Vec<AdapterSlot> = slots.into_iter().take(count).collect();
        slots.resize_with(count, AdapterSlot::disabled);
        Self { slots }
    }

    pub fn disabled(count: usize) -> Self {
        Self::new(count, [])
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AdapterSlot> {
        self.slots.iter()
    }

    /// Selected adapter ids in slot order, including `"None"` entries.
    pub fn ids(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.adapter.as_str()).collect()
    }
}

/// Parameters for one image generation.
///
/// # Example
/// ```
/// use runpod_comfy::GenerationRequest;
///
/// let request = GenerationRequest::new("a ceramic bowl on a wooden table")
///     .size(768, 1024)
///     .steps(28)
///     .seed(7)
///     .adapter("SomTumThai.safetensors", 0.8);
///
/// assert_eq!(request.adapters().len(), 4);
/// assert_eq!(request.adapters().ids()[1], "None");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub guidance: f64,
    pub seed: u64,
    adapters: AdapterSlots,
}

impl GenerationRequest {
    /// Create a request with the reference defaults and [`DEFAULT_SLOT_COUNT`] adapter slots.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self::with_slot_count(prompt, DEFAULT_SLOT_COUNT)
    }

    /// Create a request whose adapter list is fixed at `slot_count` entries.
    pub fn with_slot_count(prompt: impl Into<String>, slot_count: usize) -> Self {
        Self {
            prompt: prompt.into(),
            negative_prompt: DEFAULT_NEGATIVE_PROMPT.to_string(),
            width: 1024,
            height: 1024,
            steps: 20,
            guidance: 3.5,
            seed: DEFAULT_SEED,
            adapters: AdapterSlots::disabled(slot_count),
        }
    }

    /// Set the negative prompt.
    pub fn negative(mut self, prompt: impl Into<String>) -> Self {
        self.negative_prompt = prompt.into();
        self
    }

    /// Set output dimensions.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the number of sampling steps.
    pub fn steps(mut self, steps: u32) -> Self {
        self.steps = steps;
        self
    }

    /// Set the guidance scale fed to the conditioning stage.
    pub fn guidance(mut self, guidance: f64) -> Self {
        self.guidance = guidance;
        self
    }

    /// Set a specific seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Replace the seed with a random one. The chosen seed stays readable on the request.
    pub fn randomize_seed(mut self) -> Self {
        self.seed = rand::rng().random_range(0..i64::MAX as u64);
        self
    }

    /// Put `adapter` into the first disabled slot. Ignored when every slot is taken.
    pub fn adapter(mut self, adapter: impl Into<String>, strength: f64) -> Self {
        if let Some(slot) = self.adapters.slots.iter_mut().find(|s| s.is_disabled()) {
            *slot = AdapterSlot::new(adapter, strength);
        }
        self
    }

    /// Replace all slots in order. Extra entries are dropped, missing ones disabled.
    pub fn adapters_from<I, S>(mut self, slots: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let count = self.adapters.len();
        self.adapters = AdapterSlots::new(
            count,
            slots
                .into_iter()
                .map(|(adapter, strength)| AdapterSlot::new(adapter, strength)),
        );
        self
    }

    pub fn adapters(&self) -> &AdapterSlots {
        &self.adapters
    }

    /// Check the request against deployment limits and the adapter catalog.
    pub fn validate(
        &self,
        limits: &RequestLimits,
        catalog: &AdapterCatalog,
    ) -> Result<(), ValidationError> {
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::EmptyPrompt);
        }
        if !limits.allows_resolution(self.width) || !limits.allows_resolution(self.height) {
            return Err(ValidationError::Resolution {
                width: self.width,
                height: self.height,
            });
        }
        if self.steps < limits.min_steps || self.steps > limits.max_steps {
            return Err(ValidationError::Steps {
                min: limits.min_steps,
                max: limits.max_steps,
                got: self.steps,
            });
        }
        if !self.guidance.is_finite() {
            return Err(ValidationError::Guidance);
        }
        if self.adapters.len() != limits.slot_count {
            return Err(ValidationError::SlotCount {
                expected: limits.slot_count,
                got: self.adapters.len(),
            });
        }
        for (slot, entry) in self.adapters.iter().enumerate() {
            if !catalog.is_known(&entry.adapter) {
                return Err(ValidationError::UnknownAdapter(entry.adapter.clone()));
            }
            if entry.is_disabled() && entry.strength != 0.0 {
                return Err(ValidationError::DisabledSlotStrength {
                    slot: slot + 1,
                    got: entry.strength,
                });
            }
            let in_range =
                entry.strength >= limits.min_strength && entry.strength <= limits.max_strength;
            if !in_range {
                return Err(ValidationError::Strength {
                    slot: slot + 1,
                    got: entry.strength,
                    min: limits.min_strength,
                    max: limits.max_strength,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BENJARONG: &str = "Benjarong_flux_v1.safetensors";
    const SOMTUM: &str = "SomTumThai.safetensors";

    fn valid_request() -> GenerationRequest {
        GenerationRequest::new("a bowl on a table").adapter(BENJARONG, 1.0)
    }

    #[test]
    fn test_defaults() {
        let req = GenerationRequest::new("test prompt");
        assert_eq!(req.negative_prompt, DEFAULT_NEGATIVE_PROMPT);
        assert_eq!((req.width, req.height), (1024, 1024));
        assert_eq!(req.steps, 20);
        assert_eq!(req.guidance, 3.5);
        assert_eq!(req.seed, DEFAULT_SEED);
        assert_eq!(req.adapters().len(), 4);
        assert!(req.adapters().iter().all(AdapterSlot::is_disabled));
    }

    #[test]
    fn test_disabled_slot_forces_zero_strength() {
        let slot = AdapterSlot::new(NONE_ADAPTER, 1.5);
        assert_eq!(slot.strength, 0.0);
        assert!(slot.is_disabled());
    }

    #[test]
    fn test_slots_padded_to_count() {
        let slots = AdapterSlots::new(4, [AdapterSlot::new(SOMTUM, 0.7)]);
        assert_eq!(slots.len(), 4);
        assert_eq!(slots.ids(), vec![SOMTUM, "None", "None", "None"]);
        assert!(slots.iter().skip(1).all(|s| s.strength == 0.0));
    }

    #[test]
    fn test_slots_truncated_to_count() {
        let req = GenerationRequest::with_slot_count("p", 2).adapters_from([
            (BENJARONG, 1.0),
            (SOMTUM, 0.5),
            ("WaiKru_flux_v1.safetensors", 0.3),
        ]);
        assert_eq!(req.adapters().ids(), vec![BENJARONG, SOMTUM]);
    }

    #[test]
    fn test_adapter_fills_first_free_slot_and_stops_when_full() {
        let req = GenerationRequest::with_slot_count("p", 2)
            .adapter(BENJARONG, 1.0)
            .adapter(SOMTUM, 0.5)
            .adapter("WaiKru_flux_v1.safetensors", 0.3);
        assert_eq!(req.adapters().ids(), vec![BENJARONG, SOMTUM]);
    }

    #[test]
    fn test_randomize_seed_is_non_negative_as_i64() {
        let req = GenerationRequest::new("p").randomize_seed();
        assert!(req.seed < i64::MAX as u64);
    }

    #[test]
    fn test_validate_accepts_reference_request() {
        let result = valid_request().validate(&RequestLimits::default(), &AdapterCatalog::reference());
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_prompt() {
        let req = GenerationRequest::new("   ");
        assert_eq!(
            req.validate(&RequestLimits::default(), &AdapterCatalog::reference()),
            Err(ValidationError::EmptyPrompt)
        );
    }

    #[test]
    fn test_validate_rejects_off_grid_resolution() {
        let req = valid_request().size(1000, 1024);
        assert!(matches!(
            req.validate(&RequestLimits::default(), &AdapterCatalog::reference()),
            Err(ValidationError::Resolution { width: 1000, .. })
        ));
    }

    #[test]
    fn test_validate_step_bounds() {
        let limits = RequestLimits::default();
        let catalog = AdapterCatalog::reference();
        assert!(valid_request().steps(1).validate(&limits, &catalog).is_ok());
        assert!(valid_request().steps(100).validate(&limits, &catalog).is_ok());
        assert!(matches!(
            valid_request().steps(0).validate(&limits, &catalog),
            Err(ValidationError::Steps { got: 0, .. })
        ));
        assert!(matches!(
            valid_request().steps(101).validate(&limits, &catalog),
            Err(ValidationError::Steps { got: 101, .. })
        ));
    }

    #[test]
    fn test_validate_strength_bounds() {
        let limits = RequestLimits::default();
        let catalog = AdapterCatalog::reference();
        let too_strong = GenerationRequest::new("p").adapter(BENJARONG, 2.5);
        assert!(matches!(
            too_strong.validate(&limits, &catalog),
            Err(ValidationError::Strength { slot: 1, .. })
        ));
        let nan = GenerationRequest::new("p").adapter(BENJARONG, f64::NAN);
        assert!(nan.validate(&limits, &catalog).is_err());
        let edge = GenerationRequest::new("p").adapter(BENJARONG, 2.0);
        assert!(edge.validate(&limits, &catalog).is_ok());
    }

    #[test]
    fn test_validate_unknown_adapter() {
        let req = GenerationRequest::new("p").adapter("mystery.safetensors", 1.0);
        assert_eq!(
            req.validate(&RequestLimits::default(), &AdapterCatalog::reference()),
            Err(ValidationError::UnknownAdapter("mystery.safetensors".into()))
        );
    }

    #[test]
    fn test_validate_slot_count_mismatch() {
        let req = GenerationRequest::with_slot_count("p", 2);
        assert_eq!(
            req.validate(&RequestLimits::default(), &AdapterCatalog::reference()),
            Err(ValidationError::SlotCount {
                expected: 4,
                got: 2
            })
        );
        let two_slot = RequestLimits::default().with_slot_count(2);
        assert!(req.validate(&two_slot, &AdapterCatalog::reference()).is_ok());
    }

    #[test]
    fn test_deserialized_disabled_slot_has_zero_strength() {
        let req: GenerationRequest = serde_json::from_value(serde_json::json!({
            "prompt": "p",
            "negative_prompt": "n",
            "width": 1024,
            "height": 1024,
            "steps": 20,
            "guidance": 3.5,
            "seed": 1,
            "adapters": {"slots": [
                {"adapter": "None", "strength": 1.5},
                {"adapter": SOMTUM, "strength": 0.5},
                {"adapter": "None", "strength": 0.0},
                {"adapter": "None", "strength": 0.0}
            ]}
        }))
        .unwrap();
        let first = req.adapters().iter().next().unwrap();
        assert_eq!(first.strength, 0.0);
        assert_eq!(req.adapters().ids()[1], SOMTUM);
        assert!(req
            .validate(&RequestLimits::default(), &AdapterCatalog::reference())
            .is_ok());
    }

    #[test]
    fn test_validate_rejects_disabled_slot_with_strength() {
        let mut req = GenerationRequest::new("p");
        req.adapters.slots[2] = AdapterSlot {
            adapter: NONE_ADAPTER.to_string(),
            strength: 1.5,
        };
        assert_eq!(
            req.validate(&RequestLimits::default(), &AdapterCatalog::reference()),
            Err(ValidationError::DisabledSlotStrength { slot: 3, got: 1.5 })
        );
    }

    #[test]
    fn test_validate_rejects_non_finite_guidance() {
        let req = valid_request().guidance(f64::INFINITY);
        assert_eq!(
            req.validate(&RequestLimits::default(), &AdapterCatalog::reference()),
            Err(ValidationError::Guidance)
        );
    }
}
