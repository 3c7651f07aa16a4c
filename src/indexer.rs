use log::{ debug, info };
use thiserror::Error;

use crate::db::{ CollectionGateway, GatewayError };
use crate::planner::{ self, PlanError, PlanMode };
use crate::schema::{ IndexedRecord, RecordDescriptor };

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error(transparent)]
    Plan(#[from] PlanError),
    /// The gateway's own error, untouched.
    #[error(transparent)]
    Gateway(GatewayError),
}

impl IndexerError {
    pub fn gateway_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            IndexerError::Gateway(e) => Some(e.as_ref()),
            IndexerError::Plan(_) => None,
        }
    }
}

/// Plans the indexes of a record type and submits them to a collection in
/// a single gateway call.
///
/// Holds no state besides its [`PlanMode`]; every call starts from scratch.
/// Dropping the returned future cancels the in-flight gateway call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Indexer {
    mode: PlanMode,
}

impl Indexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: PlanMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> PlanMode {
        self.mode
    }

    /// Returns the names reported by the gateway. An empty plan returns no
    /// names and never reaches the gateway.
    pub async fn create_indexes<G>(
        &self,
        gateway: &G,
        descriptor: &RecordDescriptor
    ) -> Result<Vec<String>, IndexerError>
        where G: CollectionGateway + ?Sized
    {
        let specs = planner::plan_with(descriptor, self.mode)?;
        if specs.is_empty() {
            debug!("Record '{}' declares no indexes; skipping gateway call", descriptor.record);
            return Ok(Vec::new());
        }

        info!("Submitting {} index specs for record '{}'", specs.len(), descriptor.record);
        let names = gateway.create_indexes(&specs).await.map_err(IndexerError::Gateway)?;
        info!("Indexes ready for record '{}': {:?}", descriptor.record, names);
        Ok(names)
    }

    pub async fn create_indexes_for<T, G>(&self, gateway: &G) -> Result<Vec<String>, IndexerError>
        where T: IndexedRecord, G: CollectionGateway + ?Sized
    {
        self.create_indexes(gateway, &T::descriptor()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::ParseError;
    use crate::schema::IndexSpec;
    use async_trait::async_trait;
    use std::sync::atomic::{ AtomicUsize, Ordering };

    #[derive(Default)]
    struct CountingGateway {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CollectionGateway for CountingGateway {
        async fn create_indexes(&self, specs: &[IndexSpec]) -> Result<Vec<String>, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(specs.iter().map(IndexSpec::effective_name).collect())
        }
    }

    #[tokio::test]
    async fn empty_plan_skips_gateway() {
        let gateway = CountingGateway::default();
        let record = RecordDescriptor::new("Plain").plain("a", "a");
        let names = Indexer::new().create_indexes(&gateway, &record).await.unwrap();
        assert!(names.is_empty());
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn whole_plan_goes_out_in_one_call() {
        let gateway = CountingGateway::default();
        let record = RecordDescriptor::new("R").indexed("a", "a", "").indexed("b", "b", "desc");
        let names = Indexer::new().create_indexes(&gateway, &record).await.unwrap();
        assert_eq!(names, vec!["a_1", "b_-1"]);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn plan_error_keeps_field_context_and_skips_gateway() {
        let gateway = CountingGateway::default();
        let record = RecordDescriptor::new("R").indexed("when", "when", "ttl=soon");
        let err = Indexer::new().create_indexes(&gateway, &record).await.unwrap_err();
        match err {
            IndexerError::Plan(PlanError::Field(field)) => {
                assert_eq!(field.field, "when");
                assert_eq!(field.cause, ParseError::InvalidTtlValue("soon".into()));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn collect_all_mode_is_carried_by_the_indexer() {
        let gateway = CountingGateway::default();
        let record = RecordDescriptor::new("R").indexed("a", "a", "x").indexed("b", "b", "y");
        let indexer = Indexer::with_mode(PlanMode::CollectAll);
        assert_eq!(indexer.mode(), PlanMode::CollectAll);
        let err = indexer.create_indexes(&gateway, &record).await.unwrap_err();
        assert!(matches!(err, IndexerError::Plan(PlanError::Fields(ref f)) if f.len() == 2));
        assert!(err.gateway_error().is_none());
    }
}
