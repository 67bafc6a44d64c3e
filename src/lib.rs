//! # Voltage Modbus Bridge - Event-Driven Modbus Protocol Adapter
//!
//! **Author:** Evan Liu <liuyifanz.1996@gmail.com>
//! **Version:** 0.2.0
//! **License:** MIT
//!
//! An async protocol adapter that translates application events into Modbus
//! function calls and device responses back into enriched output events.
//! One function is configured per adapter; every incoming event triggers one
//! call with per-event address and value expressions.
//!
//! ## Features
//!
//! - **Two Transports**: Modbus TCP, and serial RTU behind the `rtu` feature
//! - **Per-Event Expressions**: addresses and values resolved from event fields
//! - **Self-Healing**: transport failures trigger one reconnect and retry
//! - **Serial Backpressure**: bounded waiting with shedding on the shared line
//! - **Traceable Output**: every output event carries the call parameters
//!   that produced it, plus a UTC timestamp
//!
//! ## Supported Function Codes
//!
//! | Code | Function | Direction |
//! |------|----------|-----------|
//! | 0x01 | Read Coils | read |
//! | 0x02 | Read Discrete Inputs | read |
//! | 0x03 | Read Holding Registers | read |
//! | 0x04 | Read Input Registers | read |
//! | 0x05 | Write Single Coil | write |
//! | 0x06 | Write Single Register | write |
//! | 0x0F | Write Multiple Coils | write |
//! | 0x10 | Write Multiple Registers | write |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use voltage_modbus_bridge::{AdapterResult, Event, TcpAdapter, TcpConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> AdapterResult<()> {
//!     // Read 4 holding registers per event, at the address the event names
//!     let config: TcpConfig = serde_json::from_value(json!({
//!         "host": "127.0.0.1",
//!         "function": "read_holding_registers",
//!         "address": "{{ register }}",
//!         "count": 4,
//!     }))?;
//!
//!     let adapter = TcpAdapter::configure(&config).await?;
//!     let events = vec![Event::from_value(json!({ "register": 100 })).unwrap()];
//!     if let Some(outputs) = adapter.process(events).await {
//!         for out in outputs {
//!             println!("{}", out.into_value());
//!         }
//!     }
//!
//!     adapter.stop().await;
//!     Ok(())
//! }
//! ```

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Supported Modbus functions and their parameter shapes
pub mod function;

/// Application events in and out of the adapter
pub mod event;

/// Per-event expressions and address resolution
pub mod expr;

/// Per-event call parameters
pub mod params;

/// Adapter configuration for both transports
pub mod config;

/// Transport surface over the Modbus wire library
pub mod transport;

/// Connection lifecycle management
pub mod connection;

/// Call execution and the reconnect-and-retry policy
pub mod executor;

/// Serial line admission control
pub mod gate;

/// The configure/process/stop adapter pipeline
pub mod pipeline;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Async runtime (users can use voltage_modbus_bridge::tokio) ===
pub use tokio;

// === Adapter API ===
pub use pipeline::{ModbusAdapter, TcpAdapter};

#[cfg(feature = "rtu")]
pub use pipeline::RtuAdapter;

// === Error handling ===
pub use error::{AdapterError, AdapterResult};

// === Core types ===
pub use config::{RtuConfig, SerialPortConfig, TcpConfig};
pub use event::Event;
pub use expr::{AddressResolver, Expr};
pub use function::FunctionSpec;
pub use params::{CallParameters, CallPayload, ParameterBuilder};

// === Transport layer (advanced usage) ===
pub use connection::ConnectionManager;
pub use executor::Executor;
pub use gate::{AdmissionGate, AdmissionGuard};
pub use transport::{ModbusTransport, ResponsePayload, TcpConnector, TransportConnector};

#[cfg(feature = "rtu")]
pub use transport::RtuConnector;

/// Default timeout for TCP operations (5 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Modbus TCP default port
pub const DEFAULT_TCP_PORT: u16 = 502;

/// Default ceiling on events waiting for the serial line
pub const DEFAULT_ADMISSION_CEILING: usize = 5;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn info() -> String {
    format!(
        "Voltage Modbus Bridge v{} - Event-driven Modbus protocol adapter by Evan Liu",
        VERSION
    )
}
