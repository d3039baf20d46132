use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_DAYS: u8 = 1;
pub const MAX_DAYS: u8 = 14;
pub const DEFAULT_DAYS: u8 = 3;

/// Interests offered by the trip form.
pub const INTEREST_OPTIONS: &[&str] = &[
    "Hrady a zámky",
    "Hory a turistika",
    "Gastronomie",
    "Moderní architektura",
    "Muzea",
    "Noční život",
    "Lázně a relax",
    "Pro děti",
];

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Travelers {
    Solo,
    #[default]
    Couple,
    Family,
    Group,
}

impl Travelers {
    pub const ALL: [Travelers; 4] = [
        Travelers::Solo,
        Travelers::Couple,
        Travelers::Family,
        Travelers::Group,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Travelers::Solo => "solo",
            Travelers::Couple => "couple",
            Travelers::Family => "family",
            Travelers::Group => "group",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Travelers::Solo => "On my own",
            Travelers::Couple => "As a couple",
            Travelers::Family => "With family",
            Travelers::Group => "With a group of friends",
        }
    }
}

impl fmt::Display for Travelers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Travelers {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "solo" => Ok(Travelers::Solo),
            "couple" => Ok(Travelers::Couple),
            "family" => Ok(Travelers::Family),
            "group" => Ok(Travelers::Group),
            _ => Err(format!(
                "Unknown travelers '{s}', expected one of: solo, couple, family, group"
            )),
        }
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum TravelStyle {
    #[default]
    Adventure,
    Luxury,
    Budget,
    Culture,
    Nature,
}

impl TravelStyle {
    pub const ALL: [TravelStyle; 5] = [
        TravelStyle::Adventure,
        TravelStyle::Luxury,
        TravelStyle::Budget,
        TravelStyle::Culture,
        TravelStyle::Nature,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TravelStyle::Adventure => "adventure",
            TravelStyle::Luxury => "luxury",
            TravelStyle::Budget => "budget",
            TravelStyle::Culture => "culture",
            TravelStyle::Nature => "nature",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TravelStyle::Adventure => "Adventure",
            TravelStyle::Luxury => "Luxury",
            TravelStyle::Budget => "Low budget",
            TravelStyle::Culture => "Culture",
            TravelStyle::Nature => "Nature",
        }
    }
}

impl fmt::Display for TravelStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adventure" => Ok(TravelStyle::Adventure),
            "luxury" => Ok(TravelStyle::Luxury),
            "budget" => Ok(TravelStyle::Budget),
            "culture" => Ok(TravelStyle::Culture),
            "nature" => Ok(TravelStyle::Nature),
            _ => Err(format!(
                "Unknown travel style '{s}', expected one of: adventure, luxury, budget, culture, nature"
            )),
        }
    }
}

fn default_days() -> u8 {
    DEFAULT_DAYS
}

/// What the traveller asked for. Field names match the stored JSON form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PlanRequest {
    /// Where the trip goes, e.g. "South Moravia"
    pub destination: String,
    /// Trip length in days (1-14)
    #[serde(default = "default_days")]
    pub days: u8,
    #[serde(default)]
    pub travelers: Travelers,
    #[serde(default)]
    pub style: TravelStyle,
    #[serde(default)]
    pub interests: Vec<String>,
}

impl PlanRequest {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            days: DEFAULT_DAYS,
            travelers: Travelers::default(),
            style: TravelStyle::default(),
            interests: Vec::new(),
        }
    }

    pub fn with_days(mut self, days: u8) -> Self {
        self.days = days;
        self
    }

    pub fn with_travelers(mut self, travelers: Travelers) -> Self {
        self.travelers = travelers;
        self
    }

    pub fn with_style(mut self, style: TravelStyle) -> Self {
        self.style = style;
        self
    }

    /// Adds interests in order, skipping blanks and duplicates.
    pub fn with_interests<I, S>(mut self, interests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for interest in interests {
            let interest = interest.into().trim().to_string();
            if !interest.is_empty() && !self.interests.contains(&interest) {
                self.interests.push(interest);
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.destination.trim().is_empty() {
            return Err("Destination is required".to_string());
        }
        if !(MIN_DAYS..=MAX_DAYS).contains(&self.days) {
            return Err(format!(
                "Trip length must be between {MIN_DAYS} and {MAX_DAYS} days, got {}",
                self.days
            ));
        }
        Ok(())
    }
}

/// Coordinates used to bias the maps search.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl FromStr for LatLng {
    type Err = String;

    /// Parses `"<lat>,<lng>"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| format!("Invalid location '{s}', expected '<lat>,<lng>'"))?;
        let latitude: f64 = lat
            .trim()
            .parse()
            .map_err(|e| format!("Invalid latitude '{}': {e}", lat.trim()))?;
        let longitude: f64 = lng
            .trim()
            .parse()
            .map_err(|e| format!("Invalid longitude '{}': {e}", lng.trim()))?;
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(format!("Latitude {latitude} is out of range"));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(format!("Longitude {longitude} is out of range"));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSource {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Web,
    Maps,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Web => "web",
            LinkKind::Maps => "maps",
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A citation returned next to the generated text. Serializes as
/// `{"web": {...}}` or `{"maps": {...}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroundingLink {
    Web(LinkSource),
    Maps(LinkSource),
}

impl GroundingLink {
    pub fn web(uri: impl Into<String>, title: impl Into<String>) -> Self {
        GroundingLink::Web(LinkSource {
            uri: uri.into(),
            title: Some(title.into()),
        })
    }

    pub fn maps(uri: impl Into<String>, title: impl Into<String>) -> Self {
        GroundingLink::Maps(LinkSource {
            uri: uri.into(),
            title: Some(title.into()),
        })
    }

    pub fn kind(&self) -> LinkKind {
        match self {
            GroundingLink::Web(_) => LinkKind::Web,
            GroundingLink::Maps(_) => LinkKind::Maps,
        }
    }

    pub fn source(&self) -> &LinkSource {
        match self {
            GroundingLink::Web(source) | GroundingLink::Maps(source) => source,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawSource {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

/// Upstream chunk shape: both tags optional, other retrieval kinds ignored.
#[derive(Debug, Default, Deserialize)]
struct RawChunk {
    #[serde(default)]
    web: Option<RawSource>,
    #[serde(default)]
    maps: Option<RawSource>,
}

impl RawChunk {
    fn into_link(self) -> Option<GroundingLink> {
        let to_source = |raw: RawSource| {
            raw.uri.map(|uri| LinkSource {
                uri,
                title: raw.title,
            })
        };
        match (self.maps.and_then(to_source), self.web.and_then(to_source)) {
            (Some(maps), _) => Some(GroundingLink::Maps(maps)),
            (None, Some(web)) => Some(GroundingLink::Web(web)),
            (None, None) => None,
        }
    }
}

/// Reads a list of grounding chunks, dropping entries that carry neither a
/// web nor a maps reference. A `null` list reads as empty.
pub fn deserialize_links<'de, D>(deserializer: D) -> Result<Vec<GroundingLink>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<RawChunk>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(RawChunk::into_link)
        .collect())
}

/// One successful generation. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<PlanRequest>,
    pub content: String,
    #[serde(
        rename = "groundingLinks",
        alias = "links",
        default,
        deserialize_with = "deserialize_links"
    )]
    pub links: Vec<GroundingLink>,
}

impl Plan {
    /// Destination for generated plans, a fixed label for shared ones.
    pub fn title(&self) -> &str {
        self.request
            .as_ref()
            .map(|r| r.destination.as_str())
            .unwrap_or("Shared trip")
    }

    pub fn days(&self) -> Option<u8> {
        self.request.as_ref().map(|r| r.days)
    }
}
