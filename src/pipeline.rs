//! The adapter pipeline
//!
//! [`ModbusAdapter`] ties the pieces together: configure once, then feed
//! batches of events through [`ModbusAdapter::process`], and tear down with
//! [`ModbusAdapter::stop`]. Each event independently resolves its address,
//! builds its call parameters, executes over the shared connection, and
//! contributes an output event on success. A failing event is skipped with
//! a log entry; its siblings in the batch are unaffected, and batch order
//! is preserved in the output.
//!
//! The two transports differ only in how events reach the executor:
//!
//! - TCP: events simply queue on the connection mutex;
//! - RTU: events pass through an [`AdmissionGate`], so arrivals beyond the
//!   waiting ceiling are shed instead of piling up behind the serial line.

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::connection::ConnectionManager;
use crate::error::AdapterResult;
use crate::event::Event;
use crate::executor::Executor;
use crate::expr::{AddressResolver, Expr};
use crate::gate::AdmissionGate;
use crate::params::ParameterBuilder;
use crate::transport::{TcpConnector, TransportConnector};

#[cfg(feature = "rtu")]
use crate::transport::RtuConnector;

/// How events reach the shared executor.
enum LineAccess<C: TransportConnector> {
    /// Unbounded queueing on the connection (TCP).
    Direct(Mutex<Executor<C>>),
    /// Bounded waiting with shedding (serial RTU).
    Gated(AdmissionGate<Executor<C>>),
}

/// A configured Modbus adapter: translates application events into Modbus
/// function calls and device responses back into output events.
pub struct ModbusAdapter<C: TransportConnector> {
    resolver: AddressResolver,
    builder: ParameterBuilder,
    line: LineAccess<C>,
}

/// Adapter over Modbus TCP.
pub type TcpAdapter = ModbusAdapter<TcpConnector>;

/// Adapter over serial Modbus RTU.
#[cfg(feature = "rtu")]
pub type RtuAdapter = ModbusAdapter<RtuConnector>;

impl ModbusAdapter<TcpConnector> {
    /// Configure a Modbus TCP adapter.
    ///
    /// The endpoint is validated and dialed eagerly; a connect failure is
    /// logged, not fatal, and the first event reopens the session.
    pub async fn configure(config: &crate::config::TcpConfig) -> AdapterResult<Self> {
        let connector = TcpConnector::from_config(config)?;
        info!(endpoint = %connector.endpoint(), function = %config.function, "Configuring Modbus TCP adapter");
        let mut executor = Executor::new(ConnectionManager::new(connector));
        if let Err(err) = executor.connect().await {
            warn!("Initial connect failed, will retry on first event: {err}");
        }
        Ok(Self {
            resolver: AddressResolver::from_config(&config.address),
            builder: ParameterBuilder::new(
                config.function,
                Expr::parse(&config.value),
                config.count,
            ),
            line: LineAccess::Direct(Mutex::new(executor)),
        })
    }
}

#[cfg(feature = "rtu")]
impl ModbusAdapter<RtuConnector> {
    /// Configure a Modbus RTU adapter over a serial line.
    ///
    /// Serial settings and the read count are validated; the port is opened
    /// eagerly, with a failure logged rather than fatal.
    pub async fn configure(config: &crate::config::RtuConfig) -> AdapterResult<Self> {
        let connector = RtuConnector::from_config(config)?;
        info!(
            port = %config.port_config.port,
            slave = config.slave_address,
            function = %config.function,
            "Configuring Modbus RTU adapter"
        );
        let mut executor = Executor::new(ConnectionManager::new(connector));
        if let Err(err) = executor.connect().await {
            warn!("Initial connect failed, will retry on first event: {err}");
        }
        Ok(Self {
            resolver: AddressResolver::from_config(&config.address),
            builder: ParameterBuilder::new(
                config.function,
                Expr::parse(&config.value),
                config.count,
            ),
            line: LineAccess::Gated(AdmissionGate::new(executor, config.admission_ceiling)),
        })
    }
}

impl<C: TransportConnector> ModbusAdapter<C> {
    /// Process a batch of events, returning the output events in batch
    /// order.
    ///
    /// Returns `None` when no event produced output, so callers can skip
    /// notification entirely for a fully-failed batch.
    ///
    /// Ordering holds within one `process` call only. Concurrent callers
    /// sharing an RTU adapter contend for the line in no particular order;
    /// only mutual exclusion on the wire is guaranteed.
    pub async fn process(&self, events: Vec<Event>) -> Option<Vec<Event>> {
        let mut outputs = Vec::new();
        for event in &events {
            let Some(address) = self.resolver.resolve(event) else {
                continue;
            };
            let Some(params) = self.builder.build(event, address) else {
                continue;
            };
            let out = match &self.line {
                LineAccess::Direct(line) => line.lock().await.execute(&params).await,
                LineAccess::Gated(gate) => match gate.admit().await {
                    Some(mut executor) => executor.execute(&params).await,
                    None => None,
                },
            };
            if let Some(out) = out {
                outputs.push(out);
            }
        }
        if outputs.is_empty() {
            None
        } else {
            Some(outputs)
        }
    }

    /// Tear down the adapter, closing the device connection.
    ///
    /// Waits for the in-flight call to finish; never shed by the admission
    /// gate.
    pub async fn stop(&self) {
        info!("Stopping Modbus adapter");
        match &self.line {
            LineAccess::Direct(line) => line.lock().await.shutdown().await,
            LineAccess::Gated(gate) => gate.lock().await.shutdown().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::error::AdapterError;
    use crate::function::FunctionSpec;
    use crate::transport::mock::{MockConnector, MockScript};
    use crate::transport::ResponsePayload;

    fn event(value: serde_json::Value) -> Event {
        Event::from_value(value).expect("object")
    }

    async fn direct_adapter(
        script: &Arc<MockScript>,
        function: FunctionSpec,
        address: &str,
        value: &str,
        count: u16,
    ) -> ModbusAdapter<MockConnector> {
        let mut executor = Executor::new(ConnectionManager::new(MockConnector::new(Arc::clone(
            script,
        ))));
        executor.connect().await.unwrap();
        ModbusAdapter {
            resolver: AddressResolver::from_config(address),
            builder: ParameterBuilder::new(function, Expr::parse(value), count),
            line: LineAccess::Direct(Mutex::new(executor)),
        }
    }

    async fn gated_adapter(
        script: &Arc<MockScript>,
        function: FunctionSpec,
        address: &str,
        value: &str,
        count: u16,
        ceiling: usize,
    ) -> ModbusAdapter<MockConnector> {
        let mut executor = Executor::new(ConnectionManager::new(MockConnector::new(Arc::clone(
            script,
        ))));
        executor.connect().await.unwrap();
        ModbusAdapter {
            resolver: AddressResolver::from_config(address),
            builder: ParameterBuilder::new(function, Expr::parse(value), count),
            line: LineAccess::Gated(AdmissionGate::new(executor, ceiling)),
        }
    }

    #[tokio::test]
    async fn test_batch_preserves_order_and_isolates_failures() {
        let script = MockScript::new();
        script.push(Ok(ResponsePayload::Registers(vec![11])));
        script.push(Ok(ResponsePayload::Registers(vec![33])));
        let adapter = direct_adapter(
            &script,
            FunctionSpec::ReadHoldingRegisters,
            "{{ addr }}",
            "true",
            1,
        )
        .await;

        // The middle event has an unresolvable address and is skipped
        // without ever touching the transport
        let outputs = adapter
            .process(vec![
                event(json!({ "addr": 1 })),
                event(json!({ "addr": "bogus" })),
                event(json!({ "addr": 3 })),
            ])
            .await
            .unwrap();

        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].get("values"), Some(&json!([11])));
        assert_eq!(outputs[1].get("values"), Some(&json!([33])));
        assert_eq!(script.calls(), vec![(0x03, 1), (0x03, 3)]);
    }

    #[tokio::test]
    async fn test_build_failure_skips_without_a_call() {
        let script = MockScript::new();
        script.push(Ok(ResponsePayload::Written));
        script.push(Ok(ResponsePayload::Written));
        let adapter = direct_adapter(
            &script,
            FunctionSpec::WriteSingleCoil,
            "0",
            "{{ state }}",
            1,
        )
        .await;

        // The middle event resolves its address but carries no field for
        // the value expression, so parameter building fails and the event
        // is skipped without a transport call
        let outputs = adapter
            .process(vec![
                event(json!({ "state": true })),
                event(json!({})),
                event(json!({ "state": false })),
            ])
            .await
            .unwrap();

        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].get("params.value"), Some(&json!(true)));
        assert_eq!(outputs[1].get("params.value"), Some(&json!(false)));
        assert_eq!(script.calls(), vec![(0x05, 0), (0x05, 0)]);
    }

    #[tokio::test]
    async fn test_fully_failed_batch_yields_none() {
        let script = MockScript::new();
        let adapter = direct_adapter(
            &script,
            FunctionSpec::ReadCoils,
            "{{ missing }}",
            "true",
            1,
        )
        .await;

        assert!(adapter.process(vec![event(json!({}))]).await.is_none());
        assert!(adapter.process(vec![]).await.is_none());
        assert!(script.calls().is_empty());
    }

    #[tokio::test]
    async fn test_default_coil_write() {
        // address "0" and value "true" are the defaults: every event turns
        // into "switch coil 0 on"
        let script = MockScript::new();
        script.push(Ok(ResponsePayload::Written));
        let adapter =
            direct_adapter(&script, FunctionSpec::WriteSingleCoil, "0", "true", 1).await;

        let outputs = adapter
            .process(vec![event(json!({ "anything": 1 }))])
            .await
            .unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].get("params.functioncode"), Some(&json!(5)));
        assert_eq!(outputs[0].get("params.address"), Some(&json!(0)));
        assert_eq!(outputs[0].get("params.value"), Some(&json!(true)));
        assert_eq!(script.calls(), vec![(0x05, 0)]);
    }

    #[tokio::test]
    async fn test_serial_double_failure_drops_the_event() {
        // Serial read of 4 input registers at 30; the device answers
        // nothing, before and after the reconnect
        let script = MockScript::new();
        script.push(Err(AdapterError::transport("no response")));
        script.push(Err(AdapterError::transport("no response")));
        let adapter = gated_adapter(
            &script,
            FunctionSpec::ReadInputRegisters,
            "30",
            "true",
            4,
            5,
        )
        .await;

        assert!(adapter.process(vec![event(json!({}))]).await.is_none());
        // One session at configure time plus exactly one reconnect
        assert_eq!(script.connects(), 2);
        assert_eq!(script.calls(), vec![(0x04, 30), (0x04, 30)]);
    }

    #[tokio::test]
    async fn test_retried_success_is_surfaced() {
        let script = MockScript::new();
        script.push(Err(AdapterError::transport("connection reset")));
        script.push(Ok(ResponsePayload::Bits(vec![true])));
        let adapter = direct_adapter(&script, FunctionSpec::ReadCoils, "0", "true", 1).await;

        let outputs = adapter.process(vec![event(json!({}))]).await.unwrap();
        assert_eq!(outputs[0].get("values"), Some(&json!([true])));
        assert_eq!(script.connects(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_arrivals_beyond_the_ceiling_are_shed() {
        let script = MockScript::new();
        script.set_delay(Duration::from_millis(100));
        script.push(Ok(ResponsePayload::Registers(vec![1])));
        let adapter = Arc::new(
            gated_adapter(
                &script,
                FunctionSpec::ReadHoldingRegisters,
                "0",
                "true",
                1,
                1,
            )
            .await,
        );

        let busy = {
            let adapter = Arc::clone(&adapter);
            tokio::spawn(async move { adapter.process(vec![event(json!({}))]).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // The line is held and the only waiting slot is taken; this event
        // is shed without a transport call
        assert!(adapter.process(vec![event(json!({}))]).await.is_none());

        let outputs = busy.await.unwrap().unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(script.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_stop_closes_the_connection() {
        let script = MockScript::new();
        let adapter = direct_adapter(&script, FunctionSpec::ReadCoils, "0", "true", 1).await;
        adapter.stop().await;
        assert_eq!(script.closes(), 1);

        let script = MockScript::new();
        let adapter = gated_adapter(&script, FunctionSpec::ReadCoils, "0", "true", 1, 5).await;
        adapter.stop().await;
        assert_eq!(script.closes(), 1);
    }
}
