use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{EngineError, EngineResult};

/// Canonical spellings for the channels the dashboards know about. Any
/// spelling that compacts to one of these (case-insensitively) resolves to it.
const KNOWN_CHANNELS: [(&str, &[&str]); 12] = [
    ("TV", &["tv", "television"]),
    ("Digital", &["digital"]),
    ("Sponsorship", &["sponsorship"]),
    ("ContentMarketing", &["contentmarketing", "content"]),
    ("OnlineMarketing", &["onlinemarketing", "online"]),
    ("Affiliates", &["affiliates", "affiliate"]),
    ("SEM", &["sem"]),
    ("Radio", &["radio"]),
    ("Other", &["other", "others"]),
    ("Social", &["social", "socialmedia"]),
    ("Print", &["print"]),
    ("Outdoor", &["outdoor", "ooh"]),
];

const FALLBACK_COLOR: &str = "#999999";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelId(String);

impl ChannelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Strips separators and a trailing `Spend` suffix, so that
    /// `"TV_Spend"`, `"Content Marketing"` and `"content_marketing"` all
    /// collapse to the same identifier.
    fn canonicalize(raw: &str) -> Option<String> {
        let mut compact: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect();
        if compact.len() > "spend".len() && compact.to_ascii_lowercase().ends_with("spend") {
            compact.truncate(compact.len() - "spend".len());
        }
        if compact.is_empty() {
            return None;
        }
        let lowered = compact.to_ascii_lowercase();
        let canonical = KNOWN_CHANNELS
            .iter()
            .find(|(_, aliases)| aliases.contains(&lowered.as_str()))
            .map(|(name, _)| (*name).to_string());
        Some(canonical.unwrap_or(compact))
    }
}

impl Display for ChannelId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error)]
#[error("invalid channel name: {0:?}")]
pub struct ChannelParseError(pub String);

impl FromStr for ChannelId {
    type Err = ChannelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::canonicalize(s)
            .map(Self)
            .ok_or_else(|| ChannelParseError(s.to_string()))
    }
}

impl TryFrom<String> for ChannelId {
    type Error = ChannelParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChannelId> for String {
    fn from(value: ChannelId) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Channel {
    pub id: ChannelId,
    pub display_name: String,
    pub color_tag: String,
    pub roi_coefficient: f64,
    pub saturation_constant: f64,
}

impl Channel {
    pub fn new(
        id: &str,
        display_name: &str,
        color_tag: &str,
        roi_coefficient: f64,
        saturation_constant: f64,
    ) -> EngineResult<Self> {
        let id = ChannelId::from_str(id).map_err(|e| EngineError::invalid(e.to_string()))?;
        if !roi_coefficient.is_finite() || roi_coefficient < 0.0 {
            return Err(EngineError::invalid(format!(
                "roi coefficient for {id} must be a non-negative number, got {roi_coefficient}"
            )));
        }
        if !saturation_constant.is_finite() || saturation_constant <= 0.0 {
            return Err(EngineError::invalid(format!(
                "saturation constant for {id} must be positive, got {saturation_constant}"
            )));
        }
        Ok(Self {
            id,
            display_name: display_name.to_string(),
            color_tag: color_tag.to_string(),
            roi_coefficient,
            saturation_constant,
        })
    }
}

/// The single shared channel reference table. Views look colors and display
/// names up here instead of carrying their own copies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelCatalog {
    channels: Vec<Channel>,
}

impl ChannelCatalog {
    pub fn new(channels: Vec<Channel>) -> EngineResult<Self> {
        for (idx, channel) in channels.iter().enumerate() {
            if channels[..idx].iter().any(|c| c.id == channel.id) {
                return Err(EngineError::invalid(format!(
                    "duplicate channel in catalog: {}",
                    channel.id
                )));
            }
        }
        Ok(Self { channels })
    }

    pub fn with_defaults() -> Self {
        let rows: [(&str, &str, &str, f64); 9] = [
            ("TV", "TV", "#1E88E5", 4.2),
            ("Digital", "Digital", "#43A047", 5.8),
            ("Sponsorship", "Sponsorship", "#FFC107", 3.1),
            ("ContentMarketing", "Content Marketing", "#E53935", 4.6),
            ("OnlineMarketing", "Online Marketing", "#8E24AA", 3.9),
            ("Affiliates", "Affiliates", "#00ACC1", 2.8),
            ("SEM", "SEM", "#FB8C00", 4.3),
            ("Radio", "Radio", "#5E35B1", 2.1),
            ("Other", "Other", "#546E7A", 1.7),
        ];
        let channels = rows
            .iter()
            .map(|(id, name, color, roi)| Channel {
                id: ChannelId((*id).to_string()),
                display_name: (*name).to_string(),
                color_tag: (*color).to_string(),
                roi_coefficient: *roi,
                saturation_constant: DEFAULT_SATURATION,
            })
            .collect();
        Self { channels }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn ids(&self) -> impl Iterator<Item = &ChannelId> {
        self.channels.iter().map(|c| &c.id)
    }

    pub fn get(&self, id: &ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|c| &c.id == id)
    }

    pub fn resolve(&self, raw: &str) -> Option<&Channel> {
        let id = ChannelId::from_str(raw).ok()?;
        self.channels
            .iter()
            .find(|c| c.id == id || c.id.as_str().eq_ignore_ascii_case(id.as_str()))
    }

    pub fn contains(&self, id: &ChannelId) -> bool {
        self.get(id).is_some()
    }

    pub fn color_for(&self, id: &ChannelId) -> &str {
        self.get(id)
            .map(|c| c.color_tag.as_str())
            .unwrap_or(FALLBACK_COLOR)
    }

    pub fn display_name_for<'a>(&'a self, id: &'a ChannelId) -> &'a str {
        self.get(id)
            .map(|c| c.display_name.as_str())
            .unwrap_or_else(|| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl Default for ChannelCatalog {
    fn default() -> Self {
        Self::with_defaults()
    }
}

pub const DEFAULT_SATURATION: f64 = 200_000.0;
