//! Transport surface over the Modbus wire library
//!
//! The adapter core talks to devices through the [`ModbusTransport`] trait:
//! one operation per supported function, each returning a payload or an
//! [`AdapterError`]. Wire framing, CRC, and MBAP handling are delegated to
//! `tokio-modbus`; this module only adapts its call surface and classifies
//! its failures.
//!
//! [`TransportConnector`] is the factory side: the connection manager uses
//! it to open fresh sessions, so a transport handle is always replaced
//! wholesale rather than repaired in place.
//!
//! Error classification:
//! - I/O failures and per-request timeouts become [`AdapterError::Transport`]
//!   (connection-state errors, eligible for reconnect-and-retry);
//! - Modbus exception responses become [`AdapterError::Exception`] (the
//!   request reached the device; retrying the same request will not help).

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use serde_json::{json, Value};
use tokio_modbus::client::{tcp, Client as _, Context, Reader, Writer};
use tokio_modbus::Slave;
use tracing::debug;

use crate::config::TcpConfig;
use crate::error::{AdapterError, AdapterResult};

#[cfg(feature = "rtu")]
use crate::config::RtuConfig;

/// Payload of a successful transport call.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    /// Coil / discrete input states from a bit read
    Bits(Vec<bool>),
    /// Register words from a register read
    Registers(Vec<u16>),
    /// Acknowledged write (the device echoes the request)
    Written,
}

impl ResponsePayload {
    /// An empty read payload produces no output event.
    pub fn is_empty(&self) -> bool {
        match self {
            ResponsePayload::Bits(bits) => bits.is_empty(),
            ResponsePayload::Registers(registers) => registers.is_empty(),
            ResponsePayload::Written => false,
        }
    }

    /// JSON rendering merged into the output event.
    pub fn to_json(&self) -> Value {
        match self {
            ResponsePayload::Bits(bits) => json!({ "values": bits }),
            ResponsePayload::Registers(registers) => json!({ "values": registers }),
            ResponsePayload::Written => json!({}),
        }
    }
}

/// The synchronous-per-call interface the adapter core needs from a Modbus
/// transport. One method per supported function, plus teardown.
pub trait ModbusTransport: Send {
    /// Read coils (FC01).
    fn read_coils(
        &mut self,
        address: u16,
        count: u16,
    ) -> impl Future<Output = AdapterResult<Vec<bool>>> + Send;

    /// Read discrete inputs (FC02).
    fn read_discrete_inputs(
        &mut self,
        address: u16,
        count: u16,
    ) -> impl Future<Output = AdapterResult<Vec<bool>>> + Send;

    /// Read holding registers (FC03).
    fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> impl Future<Output = AdapterResult<Vec<u16>>> + Send;

    /// Read input registers (FC04).
    fn read_input_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> impl Future<Output = AdapterResult<Vec<u16>>> + Send;

    /// Write a single coil (FC05).
    fn write_single_coil(
        &mut self,
        address: u16,
        value: bool,
    ) -> impl Future<Output = AdapterResult<()>> + Send;

    /// Write multiple coils (FC15).
    fn write_multiple_coils(
        &mut self,
        address: u16,
        values: &[bool],
    ) -> impl Future<Output = AdapterResult<()>> + Send;

    /// Write a single holding register (FC06).
    fn write_single_register(
        &mut self,
        address: u16,
        value: u16,
    ) -> impl Future<Output = AdapterResult<()>> + Send;

    /// Write multiple holding registers (FC16).
    fn write_multiple_registers(
        &mut self,
        address: u16,
        values: &[u16],
    ) -> impl Future<Output = AdapterResult<()>> + Send;

    /// Tear down the session.
    fn close(&mut self) -> impl Future<Output = AdapterResult<()>> + Send;
}

/// Factory for transport sessions. Opening is the only way to obtain a
/// handle, so reconnecting always yields a brand-new session.
pub trait TransportConnector: Send + Sync {
    /// The transport this connector produces.
    type Transport: ModbusTransport;

    /// Open a new session.
    fn connect(&self) -> impl Future<Output = AdapterResult<Self::Transport>> + Send;
}

/// Flatten the wire library's nested result into the adapter's error
/// taxonomy.
fn flatten<T>(function: u8, result: tokio_modbus::Result<T>) -> AdapterResult<T> {
    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(code)) => Err(AdapterError::Exception {
            function,
            code: format!("{code:?}"),
        }),
        Err(err) => Err(AdapterError::from(err)),
    }
}

/// Run one wire operation under the per-request deadline. A deadline miss
/// is a transport error: the session state is unknown afterwards.
async fn bounded<T, F>(deadline: Duration, function: u8, op: F) -> AdapterResult<T>
where
    F: Future<Output = tokio_modbus::Result<T>>,
{
    match tokio::time::timeout(deadline, op).await {
        Ok(result) => flatten(function, result),
        Err(_) => Err(AdapterError::transport(format!(
            "function {function:#04X} timed out after {deadline:?}"
        ))),
    }
}

/// Modbus TCP session.
pub struct TcpTransport {
    ctx: Context,
    timeout: Duration,
}

impl ModbusTransport for TcpTransport {
    async fn read_coils(&mut self, address: u16, count: u16) -> AdapterResult<Vec<bool>> {
        bounded(self.timeout, 0x01, self.ctx.read_coils(address, count)).await
    }

    async fn read_discrete_inputs(&mut self, address: u16, count: u16) -> AdapterResult<Vec<bool>> {
        bounded(
            self.timeout,
            0x02,
            self.ctx.read_discrete_inputs(address, count),
        )
        .await
    }

    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> AdapterResult<Vec<u16>> {
        bounded(
            self.timeout,
            0x03,
            self.ctx.read_holding_registers(address, count),
        )
        .await
    }

    async fn read_input_registers(&mut self, address: u16, count: u16) -> AdapterResult<Vec<u16>> {
        bounded(
            self.timeout,
            0x04,
            self.ctx.read_input_registers(address, count),
        )
        .await
    }

    async fn write_single_coil(&mut self, address: u16, value: bool) -> AdapterResult<()> {
        bounded(self.timeout, 0x05, self.ctx.write_single_coil(address, value)).await
    }

    async fn write_multiple_coils(&mut self, address: u16, values: &[bool]) -> AdapterResult<()> {
        bounded(
            self.timeout,
            0x0F,
            self.ctx.write_multiple_coils(address, values),
        )
        .await
    }

    async fn write_single_register(&mut self, address: u16, value: u16) -> AdapterResult<()> {
        bounded(
            self.timeout,
            0x06,
            self.ctx.write_single_register(address, value),
        )
        .await
    }

    async fn write_multiple_registers(&mut self, address: u16, values: &[u16]) -> AdapterResult<()> {
        bounded(
            self.timeout,
            0x10,
            self.ctx.write_multiple_registers(address, values),
        )
        .await
    }

    async fn close(&mut self) -> AdapterResult<()> {
        self.ctx.disconnect().await.map_err(AdapterError::from)
    }
}

/// Opens Modbus TCP sessions for a configured endpoint.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: SocketAddr,
    unit_id: u8,
    timeout: Duration,
}

impl TcpConnector {
    /// Build a connector from the TCP configuration, validating the
    /// endpoint address.
    pub fn from_config(config: &TcpConfig) -> AdapterResult<Self> {
        let addr: SocketAddr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| {
                AdapterError::configuration(format!(
                    "invalid endpoint {}:{}: {e}",
                    config.host, config.port
                ))
            })?;
        Ok(Self {
            addr,
            unit_id: config.unit_id,
            timeout: config.timeout(),
        })
    }

    /// The endpoint this connector targets.
    pub fn endpoint(&self) -> SocketAddr {
        self.addr
    }
}

impl TransportConnector for TcpConnector {
    type Transport = TcpTransport;

    async fn connect(&self) -> AdapterResult<TcpTransport> {
        debug!(endpoint = %self.addr, unit = self.unit_id, "Opening Modbus TCP session");
        let connect = tcp::connect_slave(self.addr, Slave(self.unit_id));
        let ctx = match tokio::time::timeout(self.timeout, connect).await {
            Ok(result) => result.map_err(AdapterError::from)?,
            Err(_) => {
                return Err(AdapterError::transport(format!(
                    "connect to {} timed out after {:?}",
                    self.addr, self.timeout
                )))
            }
        };
        Ok(TcpTransport {
            ctx,
            timeout: self.timeout,
        })
    }
}

/// Modbus RTU session over a serial line.
#[cfg(feature = "rtu")]
pub struct RtuTransport {
    ctx: Context,
    timeout: Duration,
}

#[cfg(feature = "rtu")]
impl ModbusTransport for RtuTransport {
    async fn read_coils(&mut self, address: u16, count: u16) -> AdapterResult<Vec<bool>> {
        bounded(self.timeout, 0x01, self.ctx.read_coils(address, count)).await
    }

    async fn read_discrete_inputs(&mut self, address: u16, count: u16) -> AdapterResult<Vec<bool>> {
        bounded(
            self.timeout,
            0x02,
            self.ctx.read_discrete_inputs(address, count),
        )
        .await
    }

    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> AdapterResult<Vec<u16>> {
        bounded(
            self.timeout,
            0x03,
            self.ctx.read_holding_registers(address, count),
        )
        .await
    }

    async fn read_input_registers(&mut self, address: u16, count: u16) -> AdapterResult<Vec<u16>> {
        bounded(
            self.timeout,
            0x04,
            self.ctx.read_input_registers(address, count),
        )
        .await
    }

    async fn write_single_coil(&mut self, address: u16, value: bool) -> AdapterResult<()> {
        bounded(self.timeout, 0x05, self.ctx.write_single_coil(address, value)).await
    }

    async fn write_multiple_coils(&mut self, address: u16, values: &[bool]) -> AdapterResult<()> {
        bounded(
            self.timeout,
            0x0F,
            self.ctx.write_multiple_coils(address, values),
        )
        .await
    }

    async fn write_single_register(&mut self, address: u16, value: u16) -> AdapterResult<()> {
        bounded(
            self.timeout,
            0x06,
            self.ctx.write_single_register(address, value),
        )
        .await
    }

    async fn write_multiple_registers(&mut self, address: u16, values: &[u16]) -> AdapterResult<()> {
        bounded(
            self.timeout,
            0x10,
            self.ctx.write_multiple_registers(address, values),
        )
        .await
    }

    async fn close(&mut self) -> AdapterResult<()> {
        // The serial descriptor is released when the context drops; the
        // explicit disconnect flushes the codec first.
        self.ctx.disconnect().await.map_err(AdapterError::from)
    }
}

/// Opens Modbus RTU sessions on a configured serial line.
#[cfg(feature = "rtu")]
#[derive(Debug, Clone)]
pub struct RtuConnector {
    port: String,
    baudrate: u32,
    parity: tokio_serial::Parity,
    data_bits: tokio_serial::DataBits,
    stop_bits: tokio_serial::StopBits,
    slave: u8,
    timeout: Duration,
}

#[cfg(feature = "rtu")]
impl RtuConnector {
    /// Build a connector from the RTU configuration, validating the serial
    /// settings and read count.
    pub fn from_config(config: &RtuConfig) -> AdapterResult<Self> {
        config.validate()?;
        Ok(Self {
            port: config.port_config.port.clone(),
            baudrate: config.port_config.baudrate,
            parity: config.port_config.parity()?,
            data_bits: config.port_config.data_bits()?,
            stop_bits: config.port_config.stop_bits()?,
            slave: config.slave_address,
            timeout: config.timeout(),
        })
    }
}

#[cfg(feature = "rtu")]
impl TransportConnector for RtuConnector {
    type Transport = RtuTransport;

    async fn connect(&self) -> AdapterResult<RtuTransport> {
        use tokio_modbus::client::rtu;
        use tokio_serial::SerialStream;

        debug!(
            port = %self.port,
            baudrate = self.baudrate,
            slave = self.slave,
            "Opening Modbus RTU session"
        );
        let builder = tokio_serial::new(&self.port, self.baudrate)
            .parity(self.parity)
            .data_bits(self.data_bits)
            .stop_bits(self.stop_bits)
            .timeout(self.timeout);
        let stream = SerialStream::open(&builder).map_err(|e| {
            AdapterError::transport(format!("failed to open serial port {}: {e}", self.port))
        })?;
        Ok(RtuTransport {
            ctx: rtu::attach_slave(stream, Slave(self.slave)),
            timeout: self.timeout,
        })
    }
}
