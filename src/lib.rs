pub mod annotation;
pub mod db;
pub mod indexer;
pub mod planner;
pub mod schema;
pub use annotation::{ parse, ParseError };
pub use db::{ CollectionGateway, GatewayError, create_gateway, get_gateway_type, GatewayType, GatewayConfig };
pub use db::memory::MemoryCollection;
pub use indexer::{ Indexer, IndexerError };
pub use planner::{ plan, plan_with, FieldIndexError, PlanError, PlanMode };
pub use schema::{
    Direction,
    FieldDescriptor,
    IndexKey,
    IndexMode,
    IndexOption,
    IndexPlan,
    IndexSpec,
    IndexedRecord,
    RecordDescriptor,
};
