//! Voltage Modbus Bridge Demo
//!
//! Demonstrates the adapter features including:
//! - Configuration with per-event address/value expressions
//! - Parameter building without a device (dry run)
//! - Processing events against a live Modbus TCP server
//!
//! Usage: cargo run --bin demo [server_address]
//! Example: cargo run --bin demo 127.0.0.1:502

use serde_json::json;
use voltage_modbus_bridge::{
    AddressResolver, Event, Expr, FunctionSpec, ParameterBuilder, TcpAdapter, TcpConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("🚀 {}", voltage_modbus_bridge::info());
    println!("=============================================\n");

    // =========================================================================
    // Part 1: Expression resolution (no connection required)
    // =========================================================================
    println!("📦 Part 1: Per-Event Expressions");
    println!("---------------------------------");

    let resolver = AddressResolver::from_config("{{ meter.register }}");
    let event = Event::from_value(json!({
        "meter": { "register": 40001, "name": "feeder-3" },
        "setpoint": 1500,
    }))
    .ok_or("event must be a JSON object")?;

    match resolver.resolve(&event) {
        Some(address) => println!("  '{{{{ meter.register }}}}' -> address {address}"),
        None => println!("  address did not resolve"),
    }

    // Literal expressions resolve the same way for every event
    let fixed = AddressResolver::from_config("0");
    println!("  '0' -> address {:?}", fixed.resolve(&event));

    // =========================================================================
    // Part 2: Parameter building (dry run)
    // =========================================================================
    println!("\n📊 Part 2: Call Parameters");
    println!("---------------------------");

    let builder = ParameterBuilder::new(
        FunctionSpec::WriteSingleHoldingRegister,
        Expr::parse("{{ setpoint }}"),
        1,
    );
    if let Some(params) = builder.build(&event, 100) {
        println!("  {} at {}:", params.function, params.address);
        println!("    {}", params.to_json());
    }

    let reader = ParameterBuilder::new(FunctionSpec::ReadHoldingRegisters, Expr::parse("true"), 4);
    if let Some(params) = reader.build(&event, 40001) {
        println!("  {} at {}:", params.function, params.address);
        println!("    {}", params.to_json());
    }

    // =========================================================================
    // Part 3: Live adapter (requires a Modbus server)
    // =========================================================================
    println!("\n🔌 Part 3: Live Adapter");
    println!("------------------------");

    let server_address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:502".to_string());
    let (host, port) = match server_address.rsplit_once(':') {
        Some((host, port)) => (host.to_string(), port.parse::<u16>()?),
        None => (server_address.clone(), 502),
    };

    println!("  Connecting to {host}:{port}...");

    let config = TcpConfig {
        host,
        port,
        function: FunctionSpec::ReadHoldingRegisters,
        address: "{{ register }}".to_string(),
        count: 4,
        ..TcpConfig::default()
    };

    let adapter = TcpAdapter::configure(&config).await?;

    let events = vec![
        Event::from_value(json!({ "register": 0 })).ok_or("event must be a JSON object")?,
        Event::from_value(json!({ "register": 100 })).ok_or("event must be a JSON object")?,
    ];

    match adapter.process(events).await {
        Some(outputs) => {
            println!("  ✅ {} output event(s):", outputs.len());
            for out in outputs {
                println!("    {}", out.into_value());
            }
        }
        None => {
            println!("  ⚠️  No output events");
            println!("  (This is expected if no Modbus server is running)");
        }
    }

    adapter.stop().await;

    println!("\n🎉 Demo completed!");
    println!("📚 Documentation: https://docs.rs/voltage_modbus_bridge");
    println!("🔗 Repository: https://github.com/EvanL1/voltage_modbus_bridge");

    Ok(())
}
