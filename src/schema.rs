use serde::ser::SerializeMap;
use serde::{ Serialize, Serializer };
use std::fmt;

/// Sort direction of an index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    /// The numeric form used in index key documents (`1` or `-1`).
    pub fn as_i32(self) -> i32 {
        match self {
            Direction::Ascending => 1,
            Direction::Descending => -1,
        }
    }
}

impl Serialize for Direction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.as_i32())
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

/// Which kind of index a field annotation asks for.
/// A TTL index is always single-field, ascending and non-unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    Sorted {
        direction: Direction,
        unique: bool,
    },
    Ttl {
        seconds: u64,
    },
}

impl Default for IndexMode {
    fn default() -> Self {
        IndexMode::Sorted {
            direction: Direction::Ascending,
            unique: false,
        }
    }
}

/// Parsed and validated form of one field annotation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexOption {
    pub mode: IndexMode,
    /// Explicit index name; `None` leaves naming to the store.
    pub name: Option<String>,
}

impl IndexOption {
    pub fn direction(&self) -> Direction {
        match self.mode {
            IndexMode::Sorted { direction, .. } => direction,
            IndexMode::Ttl { .. } => Direction::Ascending,
        }
    }

    pub fn is_unique(&self) -> bool {
        matches!(self.mode, IndexMode::Sorted { unique: true, .. })
    }

    pub fn ttl_seconds(&self) -> Option<u64> {
        match self.mode {
            IndexMode::Ttl { seconds } => Some(seconds),
            IndexMode::Sorted { .. } => None,
        }
    }
}

/// One `field: direction` entry of an index key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexKey {
    pub field: String,
    pub direction: Direction,
}

impl IndexKey {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Store-facing index definition, serialized as an index document:
/// `{"key": {"email": 1}, "name": "email_idx", "unique": true}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSpec {
    #[serde(rename = "key", serialize_with = "serialize_keys")]
    pub keys: Vec<IndexKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    #[serde(rename = "expireAfterSeconds", skip_serializing_if = "Option::is_none")]
    pub expire_after_seconds: Option<u64>,
}

fn serialize_keys<S: Serializer>(keys: &[IndexKey], serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(keys.len()))?;
    for key in keys {
        map.serialize_entry(&key.field, &key.direction)?;
    }
    map.end()
}

impl IndexSpec {
    /// Builds the spec for a single storage field from its parsed option.
    pub fn from_option(storage_field: &str, option: &IndexOption) -> Self {
        let (direction, unique, expire_after_seconds) = match option.mode {
            IndexMode::Sorted { direction, unique } => (direction, unique.then_some(true), None),
            IndexMode::Ttl { seconds } => (Direction::Ascending, None, Some(seconds)),
        };
        Self {
            keys: vec![IndexKey::new(storage_field, direction)],
            name: option.name.clone(),
            unique,
            expire_after_seconds,
        }
    }

    /// Rebuilds the option a single-key spec was derived from.
    pub fn to_option(&self) -> Option<IndexOption> {
        let [key] = self.keys.as_slice() else {
            return None;
        };
        let mode = match self.expire_after_seconds {
            Some(seconds) => IndexMode::Ttl { seconds },
            None =>
                IndexMode::Sorted {
                    direction: key.direction,
                    unique: self.unique.unwrap_or(false),
                },
        };
        Some(IndexOption {
            mode,
            name: self.name.clone(),
        })
    }

    pub fn is_unique(&self) -> bool {
        self.unique.unwrap_or(false)
    }

    /// Driver-style default name, e.g. `email_1` or `created_at_-1_id_1`.
    pub fn default_name(&self) -> String {
        self.keys
            .iter()
            .map(|k| format!("{}_{}", k.field, k.direction))
            .collect::<Vec<_>>()
            .join("_")
    }

    /// The explicit name if one was given, otherwise the default name.
    pub fn effective_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.default_name())
    }

    /// Same index definition, ignoring how it is named.
    pub fn same_definition(&self, other: &IndexSpec) -> bool {
        self.keys == other.keys &&
            self.is_unique() == other.is_unique() &&
            self.expire_after_seconds == other.expire_after_seconds
    }

    pub fn to_document(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Ordered list of specs, in field declaration order.
pub type IndexPlan = Vec<IndexSpec>;

/// Per-field metadata supplied by a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Language-level field name, used in diagnostics.
    pub field: String,
    /// Persisted document key.
    pub storage_name: String,
    /// Raw index annotation; `None` means the field is not indexed.
    pub annotation: Option<String>,
}

/// Field metadata of one record type, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordDescriptor {
    pub record: String,
    pub fields: Vec<FieldDescriptor>,
}

impl RecordDescriptor {
    pub fn new(record: impl Into<String>) -> Self {
        Self {
            record: record.into(),
            fields: Vec::new(),
        }
    }

    pub fn indexed(
        mut self,
        field: impl Into<String>,
        storage_name: impl Into<String>,
        annotation: impl Into<String>
    ) -> Self {
        self.fields.push(FieldDescriptor {
            field: field.into(),
            storage_name: storage_name.into(),
            annotation: Some(annotation.into()),
        });
        self
    }

    pub fn plain(mut self, field: impl Into<String>, storage_name: impl Into<String>) -> Self {
        self.fields.push(FieldDescriptor {
            field: field.into(),
            storage_name: storage_name.into(),
            annotation: None,
        });
        self
    }
}

/// Implemented by record types whose indexes are declared per field.
///
/// ```
/// use index_nexus::{ IndexedRecord, RecordDescriptor };
///
/// struct User {
///     email: String,
///     created_at: i64,
/// }
///
/// impl IndexedRecord for User {
///     fn descriptor() -> RecordDescriptor {
///         RecordDescriptor::new("User")
///             .indexed("email", "email", "unique,asc,name=email_idx")
///             .indexed("created_at", "created_at", "ttl=3600")
///     }
/// }
///
/// assert_eq!(User::descriptor().fields.len(), 2);
/// ```
pub trait IndexedRecord {
    fn descriptor() -> RecordDescriptor;
}
