//! Topology-specific redis connections behind a single connection type.

use std::sync::Arc;

use redis::aio::{ConnectionLike, ConnectionManager, MultiplexedConnection};
use redis::cluster::ClusterClient;
use redis::cluster_async::ClusterConnection;
use redis::sentinel::{SentinelClient, SentinelServerType};
use redis::{Client, Cmd, Pipeline, RedisError, RedisFuture, RedisResult, Value};
use tokio::sync::{Mutex, RwLock};

use tally_core::ports::StoreError;

use super::config::{RedisStoreConfig, StoreTopology};

/// Connection to whichever redis deployment was configured.
///
/// Every variant is cheap to clone and safe to share between tasks.
#[derive(Clone)]
pub enum StoreConnection {
    Single(ConnectionManager),
    Sentinel(SentinelConnection),
    Cluster(ClusterConnection),
}

impl StoreConnection {
    /// Connect to the configured topology.
    pub async fn connect(config: &RedisStoreConfig) -> Result<Self, StoreError> {
        // Use timeout to prevent hanging if Redis is unreachable
        tokio::time::timeout(config.connect_timeout, Self::open(&config.topology))
            .await
            .map_err(|_| StoreError::Connection("Connection timed out".to_string()))?
    }

    async fn open(topology: &StoreTopology) -> Result<Self, StoreError> {
        match topology {
            StoreTopology::Single { url } => {
                let client = Client::open(url.as_str()).map_err(connection_error)?;
                let conn = ConnectionManager::new(client)
                    .await
                    .map_err(connection_error)?;
                Ok(Self::Single(conn))
            }
            StoreTopology::Sentinel {
                sentinels,
                service_name,
            } => {
                let client = SentinelClient::build(
                    sentinels.clone(),
                    service_name.clone(),
                    None,
                    SentinelServerType::Master,
                )
                .map_err(connection_error)?;
                let conn = SentinelConnection::new(client)
                    .await
                    .map_err(connection_error)?;
                Ok(Self::Sentinel(conn))
            }
            StoreTopology::Cluster { nodes } => {
                let client = ClusterClient::new(nodes.clone()).map_err(connection_error)?;
                let conn = client
                    .get_async_connection()
                    .await
                    .map_err(connection_error)?;
                Ok(Self::Cluster(conn))
            }
        }
    }
}

/// Connection to a sentinel-managed master.
///
/// A request that fails with a connection-class error still fails, but the
/// master is looked up again through the sentinels before the next request,
/// so a dropped socket or a failover only costs the requests in flight.
#[derive(Clone)]
pub struct SentinelConnection {
    client: Arc<Mutex<SentinelClient>>,
    current: Arc<RwLock<MultiplexedConnection>>,
    db: i64,
}

impl SentinelConnection {
    async fn new(mut client: SentinelClient) -> RedisResult<Self> {
        let conn = client.get_async_connection().await?;
        let db = conn.get_db();
        Ok(Self {
            client: Arc::new(Mutex::new(client)),
            current: Arc::new(RwLock::new(conn)),
            db,
        })
    }

    async fn check<T>(&self, result: RedisResult<T>) -> RedisResult<T> {
        if let Err(e) = &result {
            if is_connection_error(e) {
                self.reconnect().await;
            }
        }
        result
    }

    async fn reconnect(&self) {
        let mut client = self.client.lock().await;
        match client.get_async_connection().await {
            Ok(conn) => {
                *self.current.write().await = conn;
                tracing::info!("Reconnected to sentinel master");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sentinel master lookup failed");
            }
        }
    }
}

impl ConnectionLike for SentinelConnection {
    fn req_packed_command<'a>(&'a mut self, cmd: &'a Cmd) -> RedisFuture<'a, Value> {
        Box::pin(async move {
            let mut conn = self.current.read().await.clone();
            let result = conn.req_packed_command(cmd).await;
            self.check(result).await
        })
    }

    fn req_packed_commands<'a>(
        &'a mut self,
        cmd: &'a Pipeline,
        offset: usize,
        count: usize,
    ) -> RedisFuture<'a, Vec<Value>> {
        Box::pin(async move {
            let mut conn = self.current.read().await.clone();
            let result = conn.req_packed_commands(cmd, offset, count).await;
            self.check(result).await
        })
    }

    fn get_db(&self) -> i64 {
        self.db
    }
}

impl ConnectionLike for StoreConnection {
    fn req_packed_command<'a>(&'a mut self, cmd: &'a Cmd) -> RedisFuture<'a, Value> {
        match self {
            Self::Single(conn) => conn.req_packed_command(cmd),
            Self::Sentinel(conn) => conn.req_packed_command(cmd),
            Self::Cluster(conn) => conn.req_packed_command(cmd),
        }
    }

    fn req_packed_commands<'a>(
        &'a mut self,
        cmd: &'a Pipeline,
        offset: usize,
        count: usize,
    ) -> RedisFuture<'a, Vec<Value>> {
        match self {
            Self::Single(conn) => conn.req_packed_commands(cmd, offset, count),
            Self::Sentinel(conn) => conn.req_packed_commands(cmd, offset, count),
            Self::Cluster(conn) => conn.req_packed_commands(cmd, offset, count),
        }
    }

    fn get_db(&self) -> i64 {
        match self {
            Self::Single(conn) => conn.get_db(),
            Self::Sentinel(conn) => conn.get_db(),
            Self::Cluster(conn) => conn.get_db(),
        }
    }
}

/// Whether an error means the connection itself is gone, as opposed to a
/// command the server rejected.
pub(super) fn is_connection_error(e: &RedisError) -> bool {
    e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal()
}

fn connection_error(e: RedisError) -> StoreError {
    StoreError::Connection(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use redis::ErrorKind;
    use std::io;

    #[test]
    fn test_socket_failures_trigger_reconnect() {
        for kind in [
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::BrokenPipe,
            io::ErrorKind::ConnectionRefused,
        ] {
            let err = RedisError::from(io::Error::new(kind, "socket"));
            assert!(is_connection_error(&err), "{kind:?}");
        }
    }

    #[test]
    fn test_rejected_commands_keep_connection() {
        let err = RedisError::from((ErrorKind::TypeError, "WRONGTYPE"));
        assert!(!is_connection_error(&err));

        let err = RedisError::from((ErrorKind::ResponseError, "value is not an integer"));
        assert!(!is_connection_error(&err));
    }
}
