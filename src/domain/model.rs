use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub const COMMUTE_ADDRESSES_KEY: &str = "uprent:commute-addresses";
pub const MAX_DURATIONS_KEY: &str = "uprent:max-durations";

pub const DEFAULT_MAX_DURATIONS: MaxDurations = MaxDurations {
    walking: Some(15),
    driving: Some(30),
    transit: Some(45),
    biking: Some(20),
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommuteAddress {
    pub id: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, Value>,
}

impl CommuteAddress {
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        let mut fields = serde_json::Map::new();
        fields.insert("address".to_string(), Value::String(address.into()));
        Self {
            id: id.into(),
            fields,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Walking,
    Driving,
    Transit,
    Biking,
}

impl TravelMode {
    pub const ALL: [TravelMode; 4] = [
        TravelMode::Walking,
        TravelMode::Driving,
        TravelMode::Transit,
        TravelMode::Biking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Walking => "walking",
            TravelMode::Driving => "driving",
            TravelMode::Transit => "transit",
            TravelMode::Biking => "biking",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TravelMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        TravelMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s.to_ascii_lowercase())
            .ok_or_else(|| format!("unknown travel mode: {}", s))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxDurations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub walking: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driving: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biking: Option<u32>,
}

impl MaxDurations {
    pub fn get(&self, mode: TravelMode) -> Option<u32> {
        match mode {
            TravelMode::Walking => self.walking,
            TravelMode::Driving => self.driving,
            TravelMode::Transit => self.transit,
            TravelMode::Biking => self.biking,
        }
    }

    pub fn set(&mut self, mode: TravelMode, minutes: Option<u32>) {
        let slot = match mode {
            TravelMode::Walking => &mut self.walking,
            TravelMode::Driving => &mut self.driving,
            TravelMode::Transit => &mut self.transit,
            TravelMode::Biking => &mut self.biking,
        };
        *slot = minutes;
    }

    pub fn is_empty(&self) -> bool {
        TravelMode::ALL.iter().all(|mode| self.get(*mode).is_none())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Durations {
    pub walking: Option<u32>,
    pub driving: Option<u32>,
    pub transit: Option<u32>,
    pub biking: Option<u32>,
}

impl Durations {
    pub fn get(&self, mode: TravelMode) -> Option<u32> {
        match mode {
            TravelMode::Walking => self.walking,
            TravelMode::Driving => self.driving,
            TravelMode::Transit => self.transit,
            TravelMode::Biking => self.biking,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressDuration {
    pub address: CommuteAddress,
    pub durations: Durations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackedKey {
    #[serde(rename = "uprent:commute-addresses")]
    CommuteAddresses,
    #[serde(rename = "uprent:max-durations")]
    MaxDurations,
}

impl TrackedKey {
    pub const ALL: [TrackedKey; 2] = [TrackedKey::CommuteAddresses, TrackedKey::MaxDurations];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackedKey::CommuteAddresses => COMMUTE_ADDRESSES_KEY,
            TrackedKey::MaxDurations => MAX_DURATIONS_KEY,
        }
    }

    pub fn from_storage_key(key: &str) -> Option<Self> {
        TrackedKey::ALL.into_iter().find(|k| k.as_str() == key)
    }

    pub fn default_value(&self) -> TrackedValue {
        match self {
            TrackedKey::CommuteAddresses => TrackedValue::CommuteAddresses(Vec::new()),
            TrackedKey::MaxDurations => TrackedValue::MaxDurations(DEFAULT_MAX_DURATIONS),
        }
    }

    pub fn empty_value(&self) -> TrackedValue {
        match self {
            TrackedKey::CommuteAddresses => TrackedValue::CommuteAddresses(Vec::new()),
            TrackedKey::MaxDurations => TrackedValue::MaxDurations(MaxDurations::default()),
        }
    }
}

impl fmt::Display for TrackedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackedValue {
    CommuteAddresses(Vec<CommuteAddress>),
    MaxDurations(MaxDurations),
}

impl TrackedValue {
    pub fn key(&self) -> TrackedKey {
        match self {
            TrackedValue::CommuteAddresses(_) => TrackedKey::CommuteAddresses,
            TrackedValue::MaxDurations(_) => TrackedKey::MaxDurations,
        }
    }

    pub fn from_json(key: TrackedKey, value: Value) -> Result<Self> {
        Ok(match key {
            TrackedKey::CommuteAddresses => {
                TrackedValue::CommuteAddresses(serde_json::from_value(value)?)
            }
            TrackedKey::MaxDurations => TrackedValue::MaxDurations(serde_json::from_value(value)?),
        })
    }

    pub fn parse(key: TrackedKey, raw: &str) -> Result<Self> {
        Ok(match key {
            TrackedKey::CommuteAddresses => TrackedValue::CommuteAddresses(serde_json::from_str(raw)?),
            TrackedKey::MaxDurations => TrackedValue::MaxDurations(serde_json::from_str(raw)?),
        })
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(match self {
            TrackedValue::CommuteAddresses(addresses) => serde_json::to_value(addresses)?,
            TrackedValue::MaxDurations(max_durations) => serde_json::to_value(max_durations)?,
        })
    }

    pub fn serialize(&self) -> Result<String> {
        Ok(match self {
            TrackedValue::CommuteAddresses(addresses) => serde_json::to_string(addresses)?,
            TrackedValue::MaxDurations(max_durations) => serde_json::to_string(max_durations)?,
        })
    }
}
