use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Which way an extern crosses the patch boundary.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
    /// Any other direction string. Such externs belong to neither side; the original string is
    /// not kept.
    #[serde(other)]
    Other,
}

/// A named parameter, event, or table exposed by the patch.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ExternInfo {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,

    // Generator-specific attributes (range, default value, hash, size, ...).
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Ordered `(key, info)` pairs of an extern section.
///
/// HVIR writes extern sections either as an object keyed by extern ID or as a
/// plain array. Both deserialize into the same list; array entries are keyed
/// by their position. Object keys are not de-duplicated, and the list
/// serializes back in the layout it was read from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExternList {
    entries: Vec<(String, ExternInfo)>,
    layout: Layout,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum Layout {
    #[default]
    Object,
    Array,
}

impl ExternList {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExternInfo)> {
        self.entries.iter().map(|(key, info)| (key.as_str(), info))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ExternList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.layout {
            Layout::Object => serializer.collect_map(self.entries.iter().map(|(k, v)| (k, v))),
            Layout::Array => serializer.collect_seq(self.entries.iter().map(|(_, v)| v)),
        }
    }
}

impl<'de> Deserialize<'de> for ExternList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<ExternList, D::Error> {
        deserializer.deserialize_any(ExternListVisitor)
    }
}

struct ExternListVisitor;

impl<'de> Visitor<'de> for ExternListVisitor {
    type Value = ExternList;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object or an array of extern entries")
    }

    fn visit_unit<E: de::Error>(self) -> Result<ExternList, E> {
        Ok(ExternList::default())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ExternList, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(entry) = map.next_entry::<String, ExternInfo>()? {
            entries.push(entry);
        }
        Ok(ExternList {
            entries,
            layout: Layout::Object,
        })
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<ExternList, A::Error> {
        let mut entries = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(info) = seq.next_element::<ExternInfo>()? {
            entries.push((entries.len().to_string(), info));
        }
        Ok(ExternList {
            entries,
            layout: Layout::Array,
        })
    }
}
