//! Shared domain enums and small value types used across the gateway.

use serde::{Deserialize, Serialize};

/// Business vertical a tenant operates in. Drives persona selection in the
/// prompt assembler and scopes record lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vertical {
    #[serde(rename = "IT_LAB")]
    ItLab,
    #[serde(rename = "LAW_FIRM")]
    LawFirm,
    #[serde(rename = "CAFE")]
    Cafe,
}

impl Vertical {
    /// Parse the wire form (`IT_LAB`, `LAW_FIRM`, `CAFE`), case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "IT_LAB" => Some(Vertical::ItLab),
            "LAW_FIRM" => Some(Vertical::LawFirm),
            "CAFE" => Some(Vertical::Cafe),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Vertical::ItLab => "IT_LAB",
            Vertical::LawFirm => "LAW_FIRM",
            Vertical::Cafe => "CAFE",
        }
    }

    /// Human-facing label for the record type this vertical manages.
    pub fn record_label(&self) -> &'static str {
        match self {
            Vertical::ItLab => "Repair ticket",
            Vertical::LawFirm => "Case file",
            Vertical::Cafe => "Customer order",
        }
    }
}

impl std::fmt::Display for Vertical {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response tone requested by the tenant (or per chat turn).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Technical,
    Casual,
}

impl Tone {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "professional" => Some(Tone::Professional),
            "friendly" => Some(Tone::Friendly),
            "technical" => Some(Tone::Technical),
            "casual" => Some(Tone::Casual),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Friendly => "friendly",
            Tone::Technical => "technical",
            Tone::Casual => "casual",
        }
    }
}

/// Token usage reported by the model backend at end of stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounters {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}
