use realtime_transport::{
    RealtimeEndpoints, RealtimeTransportManager, RealtimeTransportOptions, StaticToken,
};
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let endpoints = RealtimeEndpoints::new(
        std::env::var("REALTIME_WS_URL").unwrap_or_else(|_| "ws://127.0.0.1:8080/ws".into()),
        std::env::var("REALTIME_SSE_URL").unwrap_or_else(|_| "http://127.0.0.1:8080/stream".into()),
        std::env::var("REALTIME_POLL_URL").unwrap_or_else(|_| "http://127.0.0.1:8080/poll".into()),
    );

    // Create manager
    let manager = RealtimeTransportManager::<Value>::builder(
        endpoints,
        RealtimeTransportOptions {
            include_token_in_query: true,
            ..Default::default()
        },
    )?
    .token_provider(match std::env::var("REALTIME_TOKEN") {
        Ok(token) => StaticToken::new(token),
        Err(_) => StaticToken::none(),
    })
    .build();

    let _events = manager.subscribe(|event| println!("📨 {}", event));
    let _status = manager.subscribe_status(|status| {
        println!(
            "🔌 {} (connected: {}, error: {:?})",
            status.mode, status.is_connected, status.last_error
        )
    });

    // Connect
    println!("Starting realtime transport...");
    manager.start().await;
    println!("Running on {}", manager.status().mode);

    // Keep connection alive
    tokio::signal::ctrl_c().await?;

    // Disconnect
    println!("Stopping...");
    manager.stop();
    println!("Stopped!");

    Ok(())
}
