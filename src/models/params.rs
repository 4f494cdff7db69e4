use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Descriptor for a coin denomination referenced by structured tool output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde(rename = "type")]
    pub asset_type: String,
}

impl Coin {
    /// The native coin of the target network.
    pub fn native() -> Self {
        Coin {
            name: "APT".to_string(),
            symbol: "APT".to_string(),
            decimals: 8,
            asset_type: "0x1::aptos_coin::AptosCoin".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
/// One typed value inside a tool message panel
pub enum ParameterValue {
    #[serde(rename = "string")]
    Text { value: String },
    Coin {
        coin: Coin,
        #[serde(with = "u128_string")]
        value: u128,
    },
    Hash { value: String },
    Block { value: u64 },
}

impl ParameterValue {
    pub fn text<S: Into<String>>(value: S) -> Self {
        ParameterValue::Text {
            value: value.into(),
        }
    }

    pub fn coin(coin: Coin, value: u128) -> Self {
        ParameterValue::Coin { coin, value }
    }

    pub fn hash<S: Into<String>>(value: S) -> Self {
        ParameterValue::Hash {
            value: value.into(),
        }
    }

    pub fn block(value: u64) -> Self {
        ParameterValue::Block { value }
    }

    /// Get the text if this is a Text variant
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParameterValue::Text { value } => Some(value),
            _ => None,
        }
    }
}

/// Coin amounts ride as decimal strings; base-unit values can exceed what a
/// JSON number represents faithfully.
mod u128_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Insertion-ordered parameter map with upsert semantics: inserting an
/// existing key replaces its value in place, a new key appends at the end.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Params {
    entries: Vec<(String, ParameterValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, preserving the key's original position.
    pub fn insert<S: Into<String>>(&mut self, key: S, value: ParameterValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Upsert every entry of `other` into this map, in `other`'s order.
    pub fn merge(&mut self, other: Params) {
        for (key, value) in other.entries {
            self.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParameterValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, ParameterValue)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, ParameterValue)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

impl Serialize for Params {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Params {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ParamsVisitor;

        impl<'de> Visitor<'de> for ParamsVisitor {
            type Value = Params;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of parameter values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Params, A::Error> {
                let mut params = Params::new();
                while let Some((key, value)) = access.next_entry::<String, ParameterValue>()? {
                    params.insert(key, value);
                }
                Ok(params)
            }
        }

        deserializer.deserialize_map(ParamsVisitor)
    }
}
