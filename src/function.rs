//! Modbus function selection
//!
//! [`FunctionSpec`] is the closed set of operations the adapter can be
//! configured to perform. The variant is chosen once at configuration time
//! and determines which transport call is made and which parameters each
//! event must supply.
//!
//! | Variant | Code | Parameters |
//! |---------|------|------------|
//! | `ReadCoils` | 0x01 | address, count |
//! | `ReadDiscreteInputs` | 0x02 | address, count |
//! | `ReadHoldingRegisters` | 0x03 | address, count |
//! | `ReadInputRegisters` | 0x04 | address, count |
//! | `WriteSingleCoil` | 0x05 | address, value |
//! | `WriteSingleHoldingRegister` | 0x06 | address, value |
//! | `WriteMultipleCoils` | 0x0F | address, values |
//! | `WriteMultipleHoldingRegisters` | 0x10 | address, values |

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the eight Modbus operations supported by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionSpec {
    /// Read coils (FC01)
    ReadCoils,
    /// Read discrete inputs (FC02)
    ReadDiscreteInputs,
    /// Read holding registers (FC03)
    ReadHoldingRegisters,
    /// Read input registers (FC04)
    ReadInputRegisters,
    /// Write single coil (FC05)
    WriteSingleCoil,
    /// Write multiple coils (FC15)
    WriteMultipleCoils,
    /// Write single holding register (FC06)
    WriteSingleHoldingRegister,
    /// Write multiple holding registers (FC16)
    WriteMultipleHoldingRegisters,
}

/// Parameter shape required by a function, derived exhaustively from the
/// variant so a missing mapping is a compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterShape {
    /// `address` plus a configured `count`
    Read,
    /// `address` plus a single `value`
    SingleWrite,
    /// `address` plus an ordered `values` sequence
    MultipleWrite,
}

impl FunctionSpec {
    /// Numeric Modbus function code, used for RTU framing and log/output
    /// traceability.
    #[inline]
    pub fn code(&self) -> u8 {
        match self {
            FunctionSpec::ReadCoils => 0x01,
            FunctionSpec::ReadDiscreteInputs => 0x02,
            FunctionSpec::ReadHoldingRegisters => 0x03,
            FunctionSpec::ReadInputRegisters => 0x04,
            FunctionSpec::WriteSingleCoil => 0x05,
            FunctionSpec::WriteSingleHoldingRegister => 0x06,
            FunctionSpec::WriteMultipleCoils => 0x0F,
            FunctionSpec::WriteMultipleHoldingRegisters => 0x10,
        }
    }

    /// Required parameter shape for this function.
    #[inline]
    pub fn shape(&self) -> ParameterShape {
        match self {
            FunctionSpec::ReadCoils
            | FunctionSpec::ReadDiscreteInputs
            | FunctionSpec::ReadHoldingRegisters
            | FunctionSpec::ReadInputRegisters => ParameterShape::Read,
            FunctionSpec::WriteSingleCoil | FunctionSpec::WriteSingleHoldingRegister => {
                ParameterShape::SingleWrite
            }
            FunctionSpec::WriteMultipleCoils | FunctionSpec::WriteMultipleHoldingRegisters => {
                ParameterShape::MultipleWrite
            }
        }
    }

    /// Whether this is one of the four read functions.
    #[inline]
    pub fn is_read(&self) -> bool {
        self.shape() == ParameterShape::Read
    }

    /// Whether this function addresses coils/discrete inputs (single-bit
    /// data points) rather than 16-bit registers.
    #[inline]
    pub fn is_bit_function(&self) -> bool {
        matches!(
            self,
            FunctionSpec::ReadCoils
                | FunctionSpec::ReadDiscreteInputs
                | FunctionSpec::WriteSingleCoil
                | FunctionSpec::WriteMultipleCoils
        )
    }

    /// Configuration name of the function (snake_case, matches the serde
    /// representation).
    pub fn name(&self) -> &'static str {
        match self {
            FunctionSpec::ReadCoils => "read_coils",
            FunctionSpec::ReadDiscreteInputs => "read_discrete_inputs",
            FunctionSpec::ReadHoldingRegisters => "read_holding_registers",
            FunctionSpec::ReadInputRegisters => "read_input_registers",
            FunctionSpec::WriteSingleCoil => "write_single_coil",
            FunctionSpec::WriteMultipleCoils => "write_multiple_coils",
            FunctionSpec::WriteSingleHoldingRegister => "write_single_holding_register",
            FunctionSpec::WriteMultipleHoldingRegisters => "write_multiple_holding_registers",
        }
    }
}

impl fmt::Display for FunctionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (FC{:02})", self.name(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_codes() {
        assert_eq!(FunctionSpec::ReadCoils.code(), 0x01);
        assert_eq!(FunctionSpec::ReadDiscreteInputs.code(), 0x02);
        assert_eq!(FunctionSpec::ReadHoldingRegisters.code(), 0x03);
        assert_eq!(FunctionSpec::ReadInputRegisters.code(), 0x04);
        assert_eq!(FunctionSpec::WriteSingleCoil.code(), 0x05);
        assert_eq!(FunctionSpec::WriteSingleHoldingRegister.code(), 0x06);
        assert_eq!(FunctionSpec::WriteMultipleCoils.code(), 0x0F);
        assert_eq!(FunctionSpec::WriteMultipleHoldingRegisters.code(), 0x10);
    }

    #[test]
    fn test_parameter_shapes() {
        assert_eq!(FunctionSpec::ReadInputRegisters.shape(), ParameterShape::Read);
        assert_eq!(
            FunctionSpec::WriteSingleCoil.shape(),
            ParameterShape::SingleWrite
        );
        assert_eq!(
            FunctionSpec::WriteMultipleHoldingRegisters.shape(),
            ParameterShape::MultipleWrite
        );
        assert!(FunctionSpec::ReadCoils.is_read());
        assert!(!FunctionSpec::WriteSingleCoil.is_read());
    }

    #[test]
    fn test_bit_classification() {
        assert!(FunctionSpec::ReadCoils.is_bit_function());
        assert!(FunctionSpec::WriteMultipleCoils.is_bit_function());
        assert!(!FunctionSpec::ReadHoldingRegisters.is_bit_function());
        assert!(!FunctionSpec::WriteSingleHoldingRegister.is_bit_function());
    }

    #[test]
    fn test_serde_names() {
        let f: FunctionSpec = serde_json::from_str("\"write_single_coil\"").unwrap();
        assert_eq!(f, FunctionSpec::WriteSingleCoil);
        assert_eq!(
            serde_json::to_string(&FunctionSpec::ReadHoldingRegisters).unwrap(),
            "\"read_holding_registers\""
        );

        // Every variant round-trips through its configuration name
        for f in [
            FunctionSpec::ReadCoils,
            FunctionSpec::ReadDiscreteInputs,
            FunctionSpec::ReadHoldingRegisters,
            FunctionSpec::ReadInputRegisters,
            FunctionSpec::WriteSingleCoil,
            FunctionSpec::WriteMultipleCoils,
            FunctionSpec::WriteSingleHoldingRegister,
            FunctionSpec::WriteMultipleHoldingRegisters,
        ] {
            let json = format!("\"{}\"", f.name());
            let parsed: FunctionSpec = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, f);
        }
    }
}
