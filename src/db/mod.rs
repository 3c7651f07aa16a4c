pub mod memory;
pub mod surreal;
use async_trait::async_trait;
use std::error::Error;
use std::sync::Arc;
use log::info;

use crate::schema::IndexSpec;

/// Whatever the underlying store reported. Passed through untouched.
pub type GatewayError = Box<dyn Error + Send + Sync>;

/// Minimal capability a document-store collection must offer to receive
/// index definitions.
///
/// Implementations return one name per created (or already present) index,
/// in submission order. An empty `specs` slice must be a no-op returning no
/// names. A rejected spec fails the whole call; already applied specs are
/// not rolled back.
#[async_trait]
pub trait CollectionGateway: Send + Sync {
    async fn create_indexes(&self, specs: &[IndexSpec]) -> Result<Vec<String>, GatewayError>;
}

#[async_trait]
impl<G: CollectionGateway + ?Sized> CollectionGateway for Arc<G> {
    async fn create_indexes(&self, specs: &[IndexSpec]) -> Result<Vec<String>, GatewayError> {
        (**self).create_indexes(specs).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayType {
    Memory,
    Surreal,
}

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub gateway_type: GatewayType,
    pub host: String,
    pub namespace: Option<String>,
    pub database: Option<String>,
    pub table: Option<String>,
    pub user: Option<String>,
    pub pass: Option<String>,
}

pub async fn create_gateway(
    config: GatewayConfig
) -> Result<Arc<dyn CollectionGateway>, GatewayError> {
    info!("Creating collection gateway of type: {:?}", config.gateway_type);
    match config.gateway_type {
        GatewayType::Memory => Ok(Arc::new(memory::MemoryCollection::new())),
        GatewayType::Surreal => {
            let table = config.table.as_deref().ok_or("SurrealDB gateway requires a table")?;
            let gateway = surreal::SurrealCollection::new(
                &config.host,
                config.namespace.as_deref(),
                config.database.as_deref(),
                table,
                config.user.as_deref(),
                config.pass.as_deref()
            ).await?;
            Ok(Arc::new(gateway))
        }
    }
}

pub fn get_gateway_type(type_str: &str) -> Result<GatewayType, String> {
    match type_str.to_lowercase().as_str() {
        "memory" | "mem" => Ok(GatewayType::Memory),
        "surreal" | "surrealdb" => Ok(GatewayType::Surreal),
        _ => Err(format!("Unsupported collection gateway type: {}", type_str)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(gateway_type: GatewayType) -> GatewayConfig {
        GatewayConfig {
            gateway_type,
            host: "http://localhost:8000".into(),
            namespace: Some("app".into()),
            database: Some("main".into()),
            table: None,
            user: None,
            pass: None,
        }
    }

    #[test]
    fn gateway_type_names() {
        assert_eq!(get_gateway_type("Memory"), Ok(GatewayType::Memory));
        assert_eq!(get_gateway_type("surrealdb"), Ok(GatewayType::Surreal));
        assert!(get_gateway_type("mongo").is_err());
    }

    #[tokio::test]
    async fn memory_gateway_from_config() {
        let gateway = create_gateway(config(GatewayType::Memory)).await.unwrap();
        assert!(gateway.create_indexes(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn surreal_gateway_requires_table() {
        let err = create_gateway(config(GatewayType::Surreal)).await.err().unwrap();
        assert!(err.to_string().contains("table"));
    }
}
