//! Call execution and retry policy
//!
//! [`Executor`] drives one transport call per event and owns the recovery
//! policy: a transport I/O failure on the first attempt triggers one
//! reconnect followed by one retry of the same request. A second transport
//! failure, a Modbus exception response, or any other error drops the
//! event. Execution never escalates past logging; a failed event simply
//! produces no output.
//!
//! The retried attempt is a full peer of the first: if it succeeds, its
//! output event is emitted normally.

use tracing::{debug, error, warn};

use crate::connection::ConnectionManager;
use crate::error::{AdapterError, AdapterResult};
use crate::event::{output_event, Event};
use crate::function::FunctionSpec;
use crate::params::{CallParameters, CallPayload};
use crate::transport::{ModbusTransport, ResponsePayload, TransportConnector};

/// Where the executor is in the per-event retry cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryState {
    /// First attempt; a transport failure still buys a reconnect.
    First,
    /// Post-reconnect attempt; any failure is final.
    Retry,
}

/// Executes Modbus calls with the one-shot reconnect-and-retry policy.
pub struct Executor<C: TransportConnector> {
    connection: ConnectionManager<C>,
}

impl<C: TransportConnector> Executor<C> {
    /// Create an executor over a connection manager.
    pub fn new(connection: ConnectionManager<C>) -> Self {
        Self { connection }
    }

    /// Open the underlying session eagerly.
    pub async fn connect(&mut self) -> AdapterResult<()> {
        self.connection.connect().await
    }

    /// Close the underlying session.
    pub async fn shutdown(&mut self) {
        self.connection.close().await;
    }

    /// Execute one call, returning the output event on success.
    ///
    /// Returns `None` when the call produced no output: an empty read
    /// payload, or a failure that exhausted the retry policy.
    pub async fn execute(&mut self, params: &CallParameters) -> Option<Event> {
        let mut state = RetryState::First;
        loop {
            let retrying = state == RetryState::Retry;
            debug!(
                function = %params.function,
                address = params.address,
                retry = retrying,
                "Executing Modbus call"
            );
            match self.dispatch(params).await {
                Ok(payload) => {
                    if payload.is_empty() {
                        debug!(function = %params.function, "Empty response payload, no output");
                        return None;
                    }
                    return Some(output_event(payload.to_json(), params.to_json()));
                }
                Err(err) if err.is_transport_io() && !retrying => {
                    error!("Failed to execute {}: {err}", params.function);
                    // A reconnect failure is not final here; the retry
                    // attempt below reopens the session lazily.
                    if let Err(reconnect_err) = self.connection.reconnect().await {
                        warn!("Reconnect failed: {reconnect_err}");
                    }
                    state = RetryState::Retry;
                }
                Err(err) => {
                    error!("Failed to execute {}: {err}", params.function);
                    return None;
                }
            }
        }
    }

    async fn dispatch(&mut self, params: &CallParameters) -> AdapterResult<ResponsePayload> {
        let address = params.address;
        let session = self.connection.session().await?;
        match (params.function, &params.payload) {
            (FunctionSpec::ReadCoils, CallPayload::Read { count }) => session
                .read_coils(address, *count)
                .await
                .map(ResponsePayload::Bits),
            (FunctionSpec::ReadDiscreteInputs, CallPayload::Read { count }) => session
                .read_discrete_inputs(address, *count)
                .await
                .map(ResponsePayload::Bits),
            (FunctionSpec::ReadHoldingRegisters, CallPayload::Read { count }) => session
                .read_holding_registers(address, *count)
                .await
                .map(ResponsePayload::Registers),
            (FunctionSpec::ReadInputRegisters, CallPayload::Read { count }) => session
                .read_input_registers(address, *count)
                .await
                .map(ResponsePayload::Registers),
            (FunctionSpec::WriteSingleCoil, CallPayload::WriteCoil { value }) => session
                .write_single_coil(address, *value)
                .await
                .map(|()| ResponsePayload::Written),
            (FunctionSpec::WriteMultipleCoils, CallPayload::WriteCoils { values }) => session
                .write_multiple_coils(address, values)
                .await
                .map(|()| ResponsePayload::Written),
            (FunctionSpec::WriteSingleHoldingRegister, CallPayload::WriteRegister { value }) => {
                session
                    .write_single_register(address, *value)
                    .await
                    .map(|()| ResponsePayload::Written)
            }
            (FunctionSpec::WriteMultipleHoldingRegisters, CallPayload::WriteRegisters { values }) => {
                session
                    .write_multiple_registers(address, values)
                    .await
                    .map(|()| ResponsePayload::Written)
            }
            (function, payload) => Err(AdapterError::unexpected(format!(
                "{function} cannot execute payload {payload:?}"
            ))),
        }
    }
}
