//! Connection lifecycle
//!
//! [`ConnectionManager`] owns the single transport session the adapter
//! talks through. Sessions are opened through the connector and replaced
//! wholesale on reconnect; there is no in-place repair, because after a
//! transport error the session state is unknown.
//!
//! The manager itself never retries. Retry policy lives in the executor;
//! this type only answers "give me a live handle" and "replace the handle".

use tracing::{debug, warn};

use crate::error::AdapterResult;
use crate::transport::{ModbusTransport, TransportConnector};

/// Owns and recycles the adapter's transport session.
pub struct ConnectionManager<C: TransportConnector> {
    connector: C,
    session: Option<C::Transport>,
}

impl<C: TransportConnector> ConnectionManager<C> {
    /// Create a manager with no open session.
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            session: None,
        }
    }

    /// Whether a session is currently held.
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Open a session if none is held.
    pub async fn connect(&mut self) -> AdapterResult<()> {
        if self.session.is_none() {
            self.session = Some(self.connector.connect().await?);
        }
        Ok(())
    }

    /// Close the held session, if any. Teardown failures are logged and
    /// swallowed; the handle is dropped either way.
    pub async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(err) = session.close().await {
                warn!("Error closing connection: {err}");
            }
        }
    }

    /// Discard the current session and open a fresh one.
    pub async fn reconnect(&mut self) -> AdapterResult<()> {
        debug!("Reconnecting transport session");
        self.close().await;
        self.connect().await
    }

    /// Borrow the live session, opening one lazily if needed.
    pub async fn session(&mut self) -> AdapterResult<&mut C::Transport> {
        self.connect().await?;
        match self.session.as_mut() {
            Some(session) => Ok(session),
            // connect() either filled the slot or returned the error above
            None => Err(crate::error::AdapterError::unexpected(
                "connection manager holds no session after connect",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::AdapterError;
    use crate::transport::mock::{MockConnector, MockScript};
    use crate::transport::ResponsePayload;

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let script = MockScript::new();
        let mut manager = ConnectionManager::new(MockConnector::new(Arc::clone(&script)));

        assert!(!manager.is_connected());
        manager.connect().await.unwrap();
        manager.connect().await.unwrap();
        assert!(manager.is_connected());
        assert_eq!(script.connects(), 1);
    }

    #[tokio::test]
    async fn test_session_connects_lazily() {
        let script = MockScript::new();
        script.push(Ok(ResponsePayload::Bits(vec![true])));
        let mut manager = ConnectionManager::new(MockConnector::new(Arc::clone(&script)));

        let session = manager.session().await.unwrap();
        let bits = session.read_coils(0, 1).await.unwrap();
        assert_eq!(bits, vec![true]);
        assert_eq!(script.connects(), 1);
    }

    #[tokio::test]
    async fn test_reconnect_replaces_session() {
        let script = MockScript::new();
        let mut manager = ConnectionManager::new(MockConnector::new(Arc::clone(&script)));

        manager.connect().await.unwrap();
        manager.reconnect().await.unwrap();
        assert_eq!(script.connects(), 2);
        assert_eq!(script.closes(), 1);
        assert!(manager.is_connected());
    }

    #[tokio::test]
    async fn test_connect_failure_surfaces() {
        let script = MockScript::new();
        script.fail_next_connect();
        let mut manager = ConnectionManager::new(MockConnector::new(Arc::clone(&script)));

        let err = manager.connect().await.unwrap_err();
        assert!(matches!(err, AdapterError::Transport { .. }));
        assert!(!manager.is_connected());

        // The next attempt succeeds once the fault clears
        manager.connect().await.unwrap();
        assert!(manager.is_connected());
    }

    #[tokio::test]
    async fn test_close_without_session_is_a_no_op() {
        let script = MockScript::new();
        let mut manager = ConnectionManager::new(MockConnector::new(Arc::clone(&script)));
        manager.close().await;
        assert_eq!(script.closes(), 0);
    }
}
