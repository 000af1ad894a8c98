use std::collections::BTreeMap;
use std::fmt;
use chrono::NaiveTime;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Serialize, Deserialize};

/// Node type metadata from `/api/v1/logics/`, keyed by logic class path.
pub type Logics = BTreeMap<String, LogicClass>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogicClass {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Settings fields in the order the server declares them.
    #[serde(
        default,
        deserialize_with = "ordered_fields::deserialize",
        serialize_with = "ordered_fields::serialize"
    )]
    pub settings_fields: Vec<(String, SettingsField)>,
}

impl LogicClass {
    pub fn field(&self, key: &str) -> Option<&SettingsField> {
        self.settings_fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, f)| f)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettingsField {
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Password,
    Integer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    Time,
}

/// Parse the value of a time field, as a browser time input sends it:
/// `HH:MM`, optionally with seconds and a fraction.
pub fn parse_clock_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S%.f"))
        .ok()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Country {
    pub name: String,
    #[serde(default)]
    pub timezones: String,
    #[serde(default)]
    pub price_source: serde_json::Value,
}

pub type Countries = BTreeMap<String, Country>;

/// `[tz name, display label]` pairs in server order.
pub type Timezones = Vec<(String, String)>;

/// Reference data fetched once at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticData {
    pub logics: Logics,
    pub countries: Countries,
    pub timezones: Timezones,
}

// JSON objects are unordered for serde_json's default map, so the field
// order is captured straight from the map visitor instead.
mod ordered_fields {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, SettingsField)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = Vec<(String, SettingsField)>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of settings field descriptors")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut fields = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, field)) = map.next_entry::<String, SettingsField>()? {
                    if fields.iter().any(|(k, _)| *k == key) {
                        return Err(de::Error::custom(format!("duplicate settings field `{}`", key)));
                    }
                    fields.push((key, field));
                }
                Ok(fields)
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }

    pub fn serialize<S>(fields: &[(String, SettingsField)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for (key, field) in fields {
            map.serialize_entry(key, field)?;
        }
        map.end()
    }
}
