//! Per-event expressions and address resolution
//!
//! The host framework configures the adapter with small expressions that
//! are evaluated once per event:
//!
//! - a literal, parsed as a JSON scalar (`"0"`, `"true"`, `"[1, 2]"`);
//! - a field template `{{ path.to.field }}` resolving against the event.
//!
//! Template interiors that name no event field fall back to JSON-literal
//! parsing, so a static `{{ true }}` behaves like the literal `true`.
//!
//! [`AddressResolver`] wraps the configured address expression and coerces
//! its result to a register/coil address. Resolution failures are logged as
//! warnings and yield no value; the pipeline skips the event without
//! touching the transport.

use serde_json::Value;
use tracing::warn;

use crate::error::{AdapterError, AdapterResult};
use crate::event::Event;

/// A configured per-event expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A fixed value, the same for every event.
    Literal(Value),
    /// A `{{ field.path }}` reference into the event.
    Field(String),
}

impl Expr {
    /// Parse an expression from its configuration string.
    ///
    /// `{{ ... }}` becomes a field reference; anything else is parsed as a
    /// JSON scalar, falling back to a plain string literal.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(inner) = trimmed
            .strip_prefix("{{")
            .and_then(|rest| rest.strip_suffix("}}"))
        {
            return Expr::Field(inner.trim().to_string());
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => Expr::Literal(value),
            Err(_) => Expr::Literal(Value::String(trimmed.to_string())),
        }
    }

    /// Evaluate the expression in the context of an event.
    pub fn eval(&self, event: &Event) -> AdapterResult<Value> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Field(path) => {
                if let Some(value) = event.get(path) {
                    return Ok(value.clone());
                }
                // A template like `{{ true }}` or `{{ 17 }}` carries its own
                // value when the event has no such field.
                match serde_json::from_str::<Value>(path) {
                    Ok(value) => Ok(value),
                    Err(_) => Err(AdapterError::evaluation(format!(
                        "event has no field '{path}'"
                    ))),
                }
            }
        }
    }
}

/// Coerce an evaluated expression result to a Modbus address.
///
/// Accepts integers in the `u16` range, integral floats, and numeric
/// strings.
pub fn coerce_address(value: &Value) -> AdapterResult<u16> {
    coerce_u16(value)
        .ok_or_else(|| AdapterError::evaluation(format!("'{value}' is not a valid address")))
}

pub(crate) fn coerce_u16(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_u64() {
                u16::try_from(i).ok()
            } else if let Some(f) = n.as_f64() {
                // Integral floats only; a fractional address is an error
                if f.fract() == 0.0 && (0.0..=f64::from(u16::MAX)).contains(&f) {
                    Some(f as u16)
                } else {
                    None
                }
            } else {
                None
            }
        }
        Value::String(s) => s.trim().parse::<u16>().ok(),
        _ => None,
    }
}

/// Evaluates the configured address expression against each event.
#[derive(Debug, Clone)]
pub struct AddressResolver {
    expr: Expr,
}

impl AddressResolver {
    /// Create a resolver from an already-parsed expression.
    pub fn new(expr: Expr) -> Self {
        Self { expr }
    }

    /// Create a resolver from a configuration string.
    pub fn from_config(raw: &str) -> Self {
        Self::new(Expr::parse(raw))
    }

    /// Resolve the starting address for one event.
    ///
    /// Returns `None` on evaluation failure or a non-integer result; the
    /// failure is logged, not raised, so a bad event never aborts its batch.
    pub fn resolve(&self, event: &Event) -> Option<u16> {
        match self.expr.eval(event).and_then(|v| coerce_address(&v)) {
            Ok(address) => Some(address),
            Err(err) => {
                warn!("Address needs to evaluate to an integer: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn event(value: Value) -> Event {
        Event::from_value(value).expect("object")
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(Expr::parse("0"), Expr::Literal(json!(0)));
        assert_eq!(Expr::parse("true"), Expr::Literal(json!(true)));
        assert_eq!(Expr::parse("[1, 2]"), Expr::Literal(json!([1, 2])));
        assert_eq!(Expr::parse("ttyUSB0"), Expr::Literal(json!("ttyUSB0")));
    }

    #[test]
    fn test_parse_templates() {
        assert_eq!(Expr::parse("{{ register }}"), Expr::Field("register".into()));
        assert_eq!(
            Expr::parse("  {{meter.address}}  "),
            Expr::Field("meter.address".into())
        );
    }

    #[test]
    fn test_eval_field_and_fallback() {
        let e = event(json!({ "register": 40001 }));
        assert_eq!(
            Expr::parse("{{ register }}").eval(&e).unwrap(),
            json!(40001)
        );
        // Static template carries its own value
        assert_eq!(Expr::parse("{{ true }}").eval(&e).unwrap(), json!(true));
        assert!(Expr::parse("{{ missing }}").eval(&e).is_err());
    }

    #[test]
    fn test_resolve_success() {
        let resolver = AddressResolver::from_config("0");
        assert_eq!(resolver.resolve(&event(json!({}))), Some(0));

        let resolver = AddressResolver::from_config("{{ addr }}");
        assert_eq!(resolver.resolve(&event(json!({ "addr": 100 }))), Some(100));
        // Numeric strings coerce, matching configured string literals
        assert_eq!(
            resolver.resolve(&event(json!({ "addr": "250" }))),
            Some(250)
        );
    }

    #[test]
    fn test_resolve_failures_yield_none() {
        let resolver = AddressResolver::from_config("{{ addr }}");
        assert_eq!(resolver.resolve(&event(json!({}))), None);
        assert_eq!(resolver.resolve(&event(json!({ "addr": "not-a-number" }))), None);
        assert_eq!(resolver.resolve(&event(json!({ "addr": 1.5 }))), None);
        assert_eq!(resolver.resolve(&event(json!({ "addr": -1 }))), None);
        assert_eq!(resolver.resolve(&event(json!({ "addr": 70000 }))), None);
        assert_eq!(resolver.resolve(&event(json!({ "addr": [1] }))), None);
    }

    proptest! {
        // Resolution is a pure function of (event, expression)
        #[test]
        fn prop_resolver_idempotent(addr in 0u32..70000) {
            let resolver = AddressResolver::from_config("{{ addr }}");
            let e = event(json!({ "addr": addr }));
            let first = resolver.resolve(&e);
            let second = resolver.resolve(&e);
            prop_assert_eq!(first, second);
            if addr <= u32::from(u16::MAX) {
                prop_assert_eq!(first, Some(addr as u16));
            } else {
                prop_assert_eq!(first, None);
            }
        }
    }
}
