//! Adapter configuration
//!
//! Serde-deserializable configuration for the two transport variants. All
//! fields carry defaults matching the common field setup (local Modbus TCP
//! gateway on port 502; 19200 8N1 serial line on `/dev/ttyUSB0`), so a
//! config file only needs to state what differs.
//!
//! ```rust
//! use voltage_modbus_bridge::TcpConfig;
//!
//! let config: TcpConfig = serde_json::from_str(r#"{
//!     "host": "10.0.0.5",
//!     "function": "write_single_coil",
//!     "address": "{{ coil }}",
//!     "value": "{{ state }}"
//! }"#).unwrap();
//! assert_eq!(config.port, 502);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, AdapterResult};
use crate::function::FunctionSpec;

/// Modbus TCP adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpConfig {
    /// Host to connect to
    pub host: String,
    /// Modbus TCP port
    pub port: u16,
    /// Modbus unit/slave identifier
    pub unit_id: u8,
    /// Function to execute per event
    pub function: FunctionSpec,
    /// Starting address expression
    pub address: String,
    /// Write value(s) expression
    pub value: String,
    /// Number of coils/registers to read (read functions only)
    pub count: u16,
    /// Connect/request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: crate::DEFAULT_TCP_PORT,
            unit_id: 1,
            function: FunctionSpec::ReadCoils,
            address: "0".to_string(),
            value: "true".to_string(),
            count: 1,
            timeout_ms: crate::DEFAULT_TIMEOUT_MS,
        }
    }
}

impl TcpConfig {
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Serial line setup for the RTU transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialPortConfig {
    /// Serial port device path
    pub port: String,
    /// Baud rate
    pub baudrate: u32,
    /// Parity: `"N"`, `"E"`, or `"O"`
    pub parity: String,
    /// Data bits per character (5-8)
    pub bytesize: u8,
    /// Stop bits (1 or 2)
    pub stopbits: u8,
}

impl Default for SerialPortConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baudrate: 19200,
            parity: "N".to_string(),
            bytesize: 8,
            stopbits: 1,
        }
    }
}

#[cfg(feature = "rtu")]
impl SerialPortConfig {
    /// Map the configured parity letter to the serial driver's enum.
    pub fn parity(&self) -> AdapterResult<tokio_serial::Parity> {
        match self.parity.trim().to_ascii_uppercase().as_str() {
            "N" => Ok(tokio_serial::Parity::None),
            "E" => Ok(tokio_serial::Parity::Even),
            "O" => Ok(tokio_serial::Parity::Odd),
            other => Err(AdapterError::configuration(format!(
                "invalid parity '{other}', expected N, E, or O"
            ))),
        }
    }

    /// Map the configured byte size to the serial driver's enum.
    pub fn data_bits(&self) -> AdapterResult<tokio_serial::DataBits> {
        match self.bytesize {
            5 => Ok(tokio_serial::DataBits::Five),
            6 => Ok(tokio_serial::DataBits::Six),
            7 => Ok(tokio_serial::DataBits::Seven),
            8 => Ok(tokio_serial::DataBits::Eight),
            other => Err(AdapterError::configuration(format!(
                "invalid byte size {other}, expected 5-8"
            ))),
        }
    }

    /// Map the configured stop bits to the serial driver's enum.
    pub fn stop_bits(&self) -> AdapterResult<tokio_serial::StopBits> {
        match self.stopbits {
            1 => Ok(tokio_serial::StopBits::One),
            2 => Ok(tokio_serial::StopBits::Two),
            other => Err(AdapterError::configuration(format!(
                "invalid stop bits {other}, expected 1 or 2"
            ))),
        }
    }
}

/// Modbus RTU adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RtuConfig {
    /// Slave address of the Modbus device
    pub slave_address: u8,
    /// Function to execute per event
    pub function: FunctionSpec,
    /// Starting address expression
    pub address: String,
    /// Number of coils/registers to read (read functions only)
    pub count: u16,
    /// Write value(s) expression
    pub value: String,
    /// Serial port setup
    pub port_config: SerialPortConfig,
    /// Response timeout in milliseconds
    pub timeout_ms: u64,
    /// Maximum number of events allowed to wait for the serial line before
    /// new arrivals are shed
    pub admission_ceiling: usize,
}

impl Default for RtuConfig {
    fn default() -> Self {
        Self {
            slave_address: 1,
            function: FunctionSpec::ReadInputRegisters,
            address: "0".to_string(),
            count: 1,
            value: "true".to_string(),
            port_config: SerialPortConfig::default(),
            timeout_ms: 50,
            admission_ceiling: crate::DEFAULT_ADMISSION_CEILING,
        }
    }
}

impl RtuConfig {
    /// Response timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validate the read count for RTU: read functions require a positive,
    /// statically configured count.
    pub fn validate(&self) -> AdapterResult<()> {
        if self.function.is_read() && self.count == 0 {
            return Err(AdapterError::configuration(
                "read functions require a positive count",
            ));
        }
        Ok(())
    }
}
