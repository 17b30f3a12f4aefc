// Wed Oct 14 2026 - Alex

use crate::database::DatabaseError;
use indexmap::IndexMap;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// An address as written in the name database: `0x`-prefixed hex or decimal,
/// relative to the image base the database was produced against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DatasetAddress(pub u64);

impl FromStr for DatasetAddress {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => s.parse::<u64>(),
        };
        parsed
            .map(DatasetAddress)
            .map_err(|_| DatabaseError::InvalidAddress(s.to_string()))
    }
}

impl fmt::Display for DatasetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

impl Serialize for DatasetAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct DatasetAddressVisitor;

impl<'de> Visitor<'de> for DatasetAddressVisitor {
    type Value = DatasetAddress;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an address as an integer or a hex/decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(DatasetAddress(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v)
            .map(DatasetAddress)
            .map_err(|_| E::custom(format!("negative address {}", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(|_| E::custom(format!("invalid address '{}'", v)))
    }
}

impl<'de> Deserialize<'de> for DatasetAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DatasetAddressVisitor)
    }
}

fn default_pointer() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceEntry {
    pub ea: DatasetAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The global holds a pointer to the instance rather than the instance itself.
    #[serde(default = "default_pointer")]
    pub pointer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualTableEntry {
    pub ea: DatasetAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassEntry {
    pub instances: Vec<InstanceEntry>,
    pub vtbls: Vec<VirtualTableEntry>,
    pub vfuncs: BTreeMap<u32, String>,
    pub funcs: IndexMap<DatasetAddress, String>,
}

impl ClassEntry {
    /// The vtable of the class itself; further entries belong to secondary bases.
    pub fn primary_vtable(&self) -> Option<&VirtualTableEntry> {
        self.vtbls.first()
    }

    pub fn parent_name(&self) -> Option<&str> {
        self.primary_vtable().and_then(|v| v.base.as_deref())
    }
}

/// The externally produced name database, in the shape the loader hands over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameDatabase {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub globals: IndexMap<DatasetAddress, String>,
    pub functions: IndexMap<DatasetAddress, String>,
    pub classes: IndexMap<String, ClassEntry>,
}

impl NameDatabase {
    pub fn from_json(json: &str) -> Result<Self, DatabaseError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, DatabaseError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn class(&self, name: &str) -> Option<&ClassEntry> {
        self.classes.get(name)
    }

    /// Walks the primary-vtable base links starting at `name`'s parent.
    ///
    /// Stops at the first missing class or when a class repeats.
    pub fn parent_chain(&self, name: &str) -> Vec<String> {
        let mut parents: Vec<String> = Vec::new();
        let mut current = self.class(name);
        while let Some(parent) = current.and_then(ClassEntry::parent_name) {
            if parent == name || parents.iter().any(|p| p == parent) {
                break;
            }
            current = self.class(parent);
            if current.is_none() {
                break;
            }
            parents.push(parent.to_string());
        }
        parents
    }
}
