use serde::{Deserialize, Serialize};

/// Scryfall card object, restricted to the fields the cache stores
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct RemoteCard {
    /// Printing id
    pub id: String,
    #[serde(default)]
    pub oracle_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub type_line: Option<String>,
    #[serde(default)]
    pub mana_cost: Option<String>,
    #[serde(default)]
    pub oracle_text: Option<String>,
    #[serde(default)]
    pub power: Option<String>,
    #[serde(default)]
    pub toughness: Option<String>,
    #[serde(default)]
    pub cmc: f64,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub color_identity: Vec<String>,
    #[serde(default)]
    pub layout: String,
    #[serde(default)]
    pub set: String,
    #[serde(default)]
    pub set_name: String,
    #[serde(default)]
    pub rarity: String,
    #[serde(default)]
    pub collector_number: String,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
    /// For double-faced and reversible cards, several fields live here
    #[serde(default)]
    pub card_faces: Option<Vec<CardFace>>,
    #[serde(default)]
    pub games: Vec<String>,
    #[serde(default)]
    pub released_at: String,
    #[serde(default)]
    pub scryfall_uri: String,
    #[serde(default)]
    pub prints_search_uri: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ImageUris {
    pub small: Option<String>,
    pub normal: Option<String>,
    pub large: Option<String>,
}

impl ImageUris {
    /// normal, then small, then large
    fn preferred(&self) -> Option<&str> {
        self.normal
            .as_deref()
            .or(self.small.as_deref())
            .or(self.large.as_deref())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct CardFace {
    pub name: String,
    #[serde(default)]
    pub oracle_id: Option<String>,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
    #[serde(default)]
    pub mana_cost: Option<String>,
    #[serde(default)]
    pub type_line: Option<String>,
    #[serde(default)]
    pub oracle_text: Option<String>,
}

impl RemoteCard {
    fn front_face(&self) -> Option<&CardFace> {
        self.card_faces.as_ref().and_then(|faces| faces.first())
    }

    /// Oracle id of the card, falling back to the front face (reversible cards)
    pub fn oracle_id(&self) -> Option<&str> {
        self.oracle_id
            .as_deref()
            .or_else(|| self.front_face().and_then(|f| f.oracle_id.as_deref()))
            .filter(|id| !id.trim().is_empty())
    }

    pub fn type_line(&self) -> Option<&str> {
        self.type_line
            .as_deref()
            .or_else(|| self.front_face().and_then(|f| f.type_line.as_deref()))
    }

    pub fn mana_cost(&self) -> Option<&str> {
        self.mana_cost
            .as_deref()
            .or_else(|| self.front_face().and_then(|f| f.mana_cost.as_deref()))
    }

    pub fn oracle_text(&self) -> Option<&str> {
        self.oracle_text
            .as_deref()
            .or_else(|| self.front_face().and_then(|f| f.oracle_text.as_deref()))
    }

    /// Get the primary image URL
    pub fn image_url(&self) -> Option<&str> {
        // Try direct image_uris first
        if let Some(ref uris) = self.image_uris {
            return uris.preferred();
        }
        // For double-faced cards, get front face image
        self.front_face()
            .and_then(|face| face.image_uris.as_ref())
            .and_then(ImageUris::preferred)
    }
}

/// One page of a Scryfall list response
#[derive(Debug, Deserialize)]
pub struct ScryfallList {
    #[serde(default)]
    pub data: Vec<RemoteCard>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_page: Option<String>,
}

/// Scryfall API error response
#[derive(Debug, Deserialize)]
pub struct ScryfallError {
    pub status: u16,
    pub code: String,
    pub details: String,
}
