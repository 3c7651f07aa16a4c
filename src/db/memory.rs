use async_trait::async_trait;
use std::sync::RwLock;
use log::{ debug, info };
use thiserror::Error;

use super::{ CollectionGateway, GatewayError };
use crate::schema::IndexSpec;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryCollectionError {
    #[error("index '{name}' already exists with different options")]
    IndexOptionsConflict {
        name: String,
    },
    #[error("index with the same key already exists under the name '{existing}' (requested '{name}')")]
    IndexKeySpecsConflict {
        name: String,
        existing: String,
    },
    #[error("collection state lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone)]
struct StoredIndex {
    name: String,
    spec: IndexSpec,
}

/// In-process collection that keeps index definitions in memory and
/// applies the same existence rules a document store does.
#[derive(Debug, Default)]
pub struct MemoryCollection {
    indexes: RwLock<Vec<StoredIndex>>,
    submissions: RwLock<Vec<Vec<IndexSpec>>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every non-empty batch handed to `create_indexes`, in call order.
    pub fn submissions(&self) -> Vec<Vec<IndexSpec>> {
        self.submissions
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Names of the indexes currently defined, in creation order.
    pub fn index_names(&self) -> Vec<String> {
        self.indexes
            .read()
            .map(|idx| idx.iter().map(|i| i.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn index(&self, name: &str) -> Option<IndexSpec> {
        self.indexes
            .read()
            .ok()?
            .iter()
            .find(|i| i.name == name)
            .map(|i| i.spec.clone())
    }

    fn check(existing: &[StoredIndex], spec: &IndexSpec) -> Result<bool, MemoryCollectionError> {
        let name = spec.effective_name();
        if let Some(found) = existing.iter().find(|i| i.name == name) {
            if found.spec.same_definition(spec) {
                return Ok(false);
            }
            return Err(MemoryCollectionError::IndexOptionsConflict { name });
        }
        if let Some(found) = existing.iter().find(|i| i.spec.keys == spec.keys) {
            return Err(MemoryCollectionError::IndexKeySpecsConflict {
                name,
                existing: found.name.clone(),
            });
        }
        Ok(true)
    }
}

#[async_trait]
impl CollectionGateway for MemoryCollection {
    async fn create_indexes(&self, specs: &[IndexSpec]) -> Result<Vec<String>, GatewayError> {
        if specs.is_empty() {
            return Ok(Vec::new());
        }
        self.submissions
            .write()
            .map_err(|_| MemoryCollectionError::Poisoned)?
            .push(specs.to_vec());

        let mut indexes = self.indexes.write().map_err(|_| MemoryCollectionError::Poisoned)?;
        // Staged copy is committed only once every spec in the batch passes.
        let mut staged = indexes.clone();
        let mut names = Vec::with_capacity(specs.len());
        for spec in specs {
            let name = spec.effective_name();
            if Self::check(&staged, spec)? {
                debug!("Creating in-memory index '{}': {:?}", name, spec);
                staged.push(StoredIndex {
                    name: name.clone(),
                    spec: spec.clone(),
                });
            } else {
                debug!("Index '{}' already exists with identical definition", name);
            }
            names.push(name);
        }
        *indexes = staged;
        info!("In-memory collection now holds {} indexes", indexes.len());
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ Direction, IndexKey };

    fn spec(field: &str, name: Option<&str>, unique: bool) -> IndexSpec {
        IndexSpec {
            keys: vec![IndexKey::new(field, Direction::Ascending)],
            name: name.map(String::from),
            unique: unique.then_some(true),
            expire_after_seconds: None,
        }
    }

    #[tokio::test]
    async fn empty_batch_is_a_noop() {
        let coll = MemoryCollection::new();
        assert!(coll.create_indexes(&[]).await.unwrap().is_empty());
        assert!(coll.submissions().is_empty());
    }

    #[tokio::test]
    async fn creates_with_default_and_explicit_names() {
        let coll = MemoryCollection::new();
        let names = coll
            .create_indexes(&[spec("email", Some("email_idx"), true), spec("age", None, false)]).await
            .unwrap();
        assert_eq!(names, vec!["email_idx", "age_1"]);
        assert_eq!(coll.index_names(), names);
        assert_eq!(coll.index("email_idx"), Some(spec("email", Some("email_idx"), true)));
    }

    #[tokio::test]
    async fn identical_recreation_is_a_noop() {
        let coll = MemoryCollection::new();
        let batch = [spec("email", Some("email_idx"), true)];
        coll.create_indexes(&batch).await.unwrap();
        assert_eq!(coll.create_indexes(&batch).await.unwrap(), vec!["email_idx"]);
        assert_eq!(coll.index_names().len(), 1);
        assert_eq!(coll.submissions().len(), 2);
    }

    #[tokio::test]
    async fn same_name_different_options_conflicts() {
        let coll = MemoryCollection::new();
        coll.create_indexes(&[spec("email", Some("email_idx"), true)]).await.unwrap();
        let err = coll.create_indexes(&[spec("email", Some("email_idx"), false)]).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<MemoryCollectionError>(),
            Some(&(MemoryCollectionError::IndexOptionsConflict { name: "email_idx".into() }))
        );
    }

    #[tokio::test]
    async fn same_key_different_name_conflicts() {
        let coll = MemoryCollection::new();
        coll.create_indexes(&[spec("email", None, false)]).await.unwrap();
        let err = coll.create_indexes(&[spec("email", Some("by_email"), false)]).await.unwrap_err();
        assert!(
            matches!(
                err.downcast_ref::<MemoryCollectionError>(),
                Some(MemoryCollectionError::IndexKeySpecsConflict { existing, .. }) if existing == "email_1"
            )
        );
    }

    #[tokio::test]
    async fn rejected_batch_applies_nothing() {
        let coll = MemoryCollection::new();
        let err = coll
            .create_indexes(&[spec("a", Some("x"), false), spec("b", Some("x"), false)]).await
            .unwrap_err();
        assert!(err.to_string().contains("'x'"));
        assert!(coll.index_names().is_empty());
    }
}
