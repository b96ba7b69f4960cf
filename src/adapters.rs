use serde::{Deserialize, Serialize};

/// Adapter id meaning "slot disabled". This is the literal the remote stack node expects.
pub const NONE_ADAPTER: &str = "None";

/// A named, strength-weighted style modifier the remote worker can load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleAdapter {
    /// File name understood by the remote worker.
    pub id: String,
    pub description: String,
    /// Words that activate the style in the prompt. May be empty.
    pub trigger_word: String,
}

impl StyleAdapter {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        trigger_word: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            trigger_word: trigger_word.into(),
        }
    }
}

/// The set of style adapters a deployment offers, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterCatalog {
    adapters: Vec<StyleAdapter>,
}

impl AdapterCatalog {
    pub fn new(adapters: impl IntoIterator<Item = StyleAdapter>) -> Self {
        Self {
            adapters: adapters.into_iter().collect(),
        }
    }

    /// Adapters installed on the reference worker.
    pub fn reference() -> Self {
        Self::new([
            StyleAdapter::new(
                "Benjarong_flux_v1.safetensors",
                "Benjarong traditional Thai ceramic style - ornate patterns and gold details",
                "Benjarong ornate designs",
            ),
            StyleAdapter::new(
                "WaiKru_flux_v1.safetensors",
                "WaiKru traditional Thai school ceremony",
                "WaiKru, traditional Thai school ceremony",
            ),
            StyleAdapter::new(
                "ChickenGreenCurry.safetensors",
                "Thai Green Curry style - vibrant green colors and food photography",
                "ChickenGreenCurry,a yellow-colored curry or stew",
            ),
            StyleAdapter::new(
                "SomTumThai.safetensors",
                "Som Tum Thai papaya salad style - fresh ingredients and Thai cuisine",
                "SomTumThai",
            ),
            StyleAdapter::new(
                "Pratukhong_BombV1_flux_v1.safetensors",
                "Pratukhong temple archway style - ornate carvings and a seated Buddha",
                "Pratukhong, A photograph of an ancient temple, likely a Buddhist temple, \
                 features a prominent, ornate archway with intricate carvings and a central \
                 figure, likely Buddha, seated in a meditative pose",
            ),
        ])
    }

    /// Look up an adapter by id. The `"None"` sentinel is never in the catalog.
    pub fn get(&self, id: &str) -> Option<&StyleAdapter> {
        self.adapters.iter().find(|a| a.id == id)
    }

    /// Whether `id` is either the `"None"` sentinel or a catalogued adapter.
    pub fn is_known(&self, id: &str) -> bool {
        id == NONE_ADAPTER || self.get(id).is_some()
    }

    /// Non-empty trigger word for `id`, if any.
    pub fn trigger_word(&self, id: &str) -> Option<&str> {
        self.get(id)
            .map(|a| a.trigger_word.as_str())
            .filter(|w| !w.is_empty())
    }

    /// Selectable ids, starting with the `"None"` sentinel.
    pub fn options(&self) -> Vec<&str> {
        std::iter::once(NONE_ADAPTER)
            .chain(self.adapters.iter().map(|a| a.id.as_str()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StyleAdapter> {
        self.adapters.iter()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
