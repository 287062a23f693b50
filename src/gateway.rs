//! Store gateway seam and its Neo4j implementation.

use log::{error, info};
use neo4rs::{query, BoltList, BoltMap, BoltNull, BoltString, BoltType, ConfigBuilder, Graph};
use serde_json::Value;

use crate::cypher::Statement;
use crate::error::GatewayError;

/// The narrow slice of a graph client the import pipeline needs.
///
/// Implementations own connection lifecycle and sessions. Calls are awaited
/// one at a time by the importer.
#[allow(async_fn_in_trait)]
pub trait StoreGateway {
    async fn execute(&self, statement: &Statement) -> Result<(), GatewayError>;

    async fn connectivity_check(&self) -> bool;
}

impl<G: StoreGateway> StoreGateway for &G {
    async fn execute(&self, statement: &Statement) -> Result<(), GatewayError> {
        (**self).execute(statement).await
    }

    async fn connectivity_check(&self) -> bool {
        (**self).connectivity_check().await
    }
}

/// Connection settings for [`Neo4jGateway`].
#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://neo4j:7687".to_string(),
            user: "neo4j".to_string(),
            password: "neo4j".to_string(),
            database: "neo4j".to_string(),
        }
    }
}

/// `neo4rs`-backed gateway. Clone is cheap.
#[derive(Clone)]
pub struct Neo4jGateway {
    graph: Graph,
    uri: String,
}

impl Neo4jGateway {
    pub async fn connect(config: &Neo4jConfig) -> Result<Self, GatewayError> {
        info!("Connecting to Neo4j at {}...", config.uri);

        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .db(config.database.as_str())
            .build()
            .map_err(|e| GatewayError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GatewayError::Connection(e.to_string()))?;

        Ok(Self {
            graph,
            uri: config.uri.clone(),
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl StoreGateway for Neo4jGateway {
    async fn execute(&self, statement: &Statement) -> Result<(), GatewayError> {
        let mut q = query(&statement.text);
        for (key, value) in &statement.params {
            q = q.param(key, to_bolt(value)?);
        }
        self.graph.run(q).await?;
        Ok(())
    }

    async fn connectivity_check(&self) -> bool {
        match self.graph.run(query("RETURN 1")).await {
            Ok(()) => true,
            Err(e) => {
                error!("❌ Neo4j not reachable: {}", e);
                false
            }
        }
    }
}

/// Convert a JSON parameter into its Bolt equivalent.
pub fn to_bolt(value: &Value) -> Result<BoltType, GatewayError> {
    Ok(match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::from(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                BoltType::from(i)
            } else if let Some(f) = n.as_f64() {
                BoltType::from(f)
            } else {
                return Err(GatewayError::Parameter(n.to_string()));
            }
        }
        Value::String(s) => BoltType::String(BoltString::from(s.as_str())),
        Value::Array(items) => {
            let mut list = BoltList::with_capacity(items.len());
            for item in items {
                list.push(to_bolt(item)?);
            }
            BoltType::List(list)
        }
        Value::Object(map) => {
            let mut bolt = BoltMap::with_capacity(map.len());
            for (k, v) in map {
                bolt.put(BoltString::from(k.as_str()), to_bolt(v)?);
            }
            BoltType::Map(bolt)
        }
    })
}
