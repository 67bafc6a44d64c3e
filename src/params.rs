//! Per-event call parameters
//!
//! [`ParameterBuilder`] turns a configured function plus one event into the
//! exact argument set the transport call needs. Parameters are fully
//! determined before any transport call is attempted; if evaluation fails,
//! the event is skipped rather than executed with partial data.
//!
//! Address resolution is deliberately separate (see [`crate::expr`]) so
//! either step can fail independently and the pipeline short-circuits
//! cheaply before touching the transport.

use serde_json::{json, Value};
use tracing::warn;

use crate::error::{AdapterError, AdapterResult};
use crate::event::Event;
use crate::expr::{coerce_u16, Expr};
use crate::function::{FunctionSpec, ParameterShape};

/// Payload portion of a call, shaped by the configured function.
#[derive(Debug, Clone, PartialEq)]
pub enum CallPayload {
    /// Read `count` coils/registers starting at the address.
    Read {
        /// Number of coils/registers to read
        count: u16,
    },
    /// Write one coil.
    WriteCoil {
        /// Coil state to write
        value: bool,
    },
    /// Write an ordered run of coils.
    WriteCoils {
        /// Coil states to write
        values: Vec<bool>,
    },
    /// Write one holding register.
    WriteRegister {
        /// Register value to write
        value: u16,
    },
    /// Write an ordered run of holding registers.
    WriteRegisters {
        /// Register values to write
        values: Vec<u16>,
    },
}

/// The complete argument set for one transport call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallParameters {
    /// The configured function this call will invoke
    pub function: FunctionSpec,
    /// Starting coil/register address
    pub address: u16,
    /// Function-shaped payload
    pub payload: CallPayload,
}

impl CallParameters {
    /// JSON rendering attached to output events for traceability. Carries
    /// the numeric function code alongside the per-call arguments.
    pub fn to_json(&self) -> Value {
        let mut params = serde_json::Map::new();
        params.insert("functioncode".into(), json!(self.function.code()));
        params.insert("address".into(), json!(self.address));
        match &self.payload {
            CallPayload::Read { count } => {
                params.insert("count".into(), json!(count));
            }
            CallPayload::WriteCoil { value } => {
                params.insert("value".into(), json!(value));
            }
            CallPayload::WriteCoils { values } => {
                params.insert("values".into(), json!(values));
            }
            CallPayload::WriteRegister { value } => {
                params.insert("value".into(), json!(value));
            }
            CallPayload::WriteRegisters { values } => {
                params.insert("values".into(), json!(values));
            }
        }
        Value::Object(params)
    }
}

/// Builds [`CallParameters`] for each event from the configured function,
/// value expression, and read count.
#[derive(Debug, Clone)]
pub struct ParameterBuilder {
    function: FunctionSpec,
    value_expr: Expr,
    read_count: u16,
}

impl ParameterBuilder {
    /// Create a builder.
    ///
    /// `read_count` applies to the four read functions only; it is clamped
    /// to at least 1.
    pub fn new(function: FunctionSpec, value_expr: Expr, read_count: u16) -> Self {
        Self {
            function,
            value_expr,
            read_count: read_count.max(1),
        }
    }

    /// The function this builder produces parameters for.
    pub fn function(&self) -> FunctionSpec {
        self.function
    }

    /// Build the parameters for one event at the resolved address.
    ///
    /// Returns `None` on a build failure (value expression error or wrong
    /// result type); the failure is logged as a warning and the event is
    /// skipped.
    pub fn build(&self, event: &Event, address: u16) -> Option<CallParameters> {
        match self.try_build(event, address) {
            Ok(params) => Some(params),
            Err(err) => {
                warn!(function = %self.function, "Failed to prepare function params: {err}");
                None
            }
        }
    }

    fn try_build(&self, event: &Event, address: u16) -> AdapterResult<CallParameters> {
        let payload = match self.function.shape() {
            ParameterShape::Read => CallPayload::Read {
                count: self.read_count,
            },
            ParameterShape::SingleWrite => {
                let value = self.value_expr.eval(event)?;
                if self.function.is_bit_function() {
                    CallPayload::WriteCoil {
                        value: coerce_coil(&value)?,
                    }
                } else {
                    CallPayload::WriteRegister {
                        value: coerce_register(&value)?,
                    }
                }
            }
            ParameterShape::MultipleWrite => {
                let value = self.value_expr.eval(event)?;
                let items = value.as_array().ok_or_else(|| {
                    AdapterError::evaluation(format!(
                        "{} requires an ordered sequence of values",
                        self.function
                    ))
                })?;
                if self.function.is_bit_function() {
                    CallPayload::WriteCoils {
                        values: items
                            .iter()
                            .map(coerce_coil)
                            .collect::<AdapterResult<_>>()?,
                    }
                } else {
                    CallPayload::WriteRegisters {
                        values: items
                            .iter()
                            .map(coerce_register)
                            .collect::<AdapterResult<_>>()?,
                    }
                }
            }
        };
        Ok(CallParameters {
            function: self.function,
            address,
            payload,
        })
    }
}

fn coerce_coil(value: &Value) -> AdapterResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        // Nonzero numbers are ON, matching coil write conventions
        Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "1" => Ok(true),
            "false" | "off" | "0" => Ok(false),
            other => Err(AdapterError::evaluation(format!(
                "'{other}' is not a valid coil state"
            ))),
        },
        other => Err(AdapterError::evaluation(format!(
            "'{other}' is not a valid coil state"
        ))),
    }
}

fn coerce_register(value: &Value) -> AdapterResult<u16> {
    coerce_u16(value).ok_or_else(|| {
        AdapterError::evaluation(format!("'{value}' is not a valid 16-bit register value"))
    })
}
