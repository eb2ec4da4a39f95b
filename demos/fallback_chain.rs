use axum::{Json, Router, routing::get};
use realtime_transport::{
    QueryParams, RealtimeCursor, RealtimeEndpoints, RealtimeTransportManager,
    RealtimeTransportOptions,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;

#[derive(Debug, Deserialize)]
struct ChatMessage {
    id: String,
    user: String,
    body: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("🦀 Testing the WebSocket -> SSE -> polling fallback\n");

    // Only the polling endpoint exists on this server
    let app = Router::new().route(
        "/poll",
        get(|| async {
            Json(json!([
                { "event_type": "message", "message": { "id": "m-1", "user": "bob", "body": "Hello via polling!" } },
                { "event_type": "message", "message": { "id": "m-2", "user": "carol", "body": "Still here" } }
            ]))
        }),
    );
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("Demo server failed: {}", e);
        }
    });

    let manager = RealtimeTransportManager::<ChatMessage>::builder(
        RealtimeEndpoints::new(
            format!("ws://{}/ws", addr),
            format!("http://{}/stream", addr),
            format!("http://{}/poll", addr),
        ),
        RealtimeTransportOptions {
            polling_interval_ms: Some(1_000),
            reconnect_interval_ms: Some(3_000),
            ws_connect_timeout_ms: Some(1_000),
            sse_connect_timeout_ms: Some(1_000),
            ..Default::default()
        },
    )?
    .cursor_from_event(|message: &ChatMessage| {
        Some(RealtimeCursor::new().with_message_id(message.id.clone()))
    })
    .poll_query(|cursor| {
        Some(QueryParams::new().append_opt(
            "since_message_id",
            cursor.and_then(|c| c.since_message_id.clone()),
        ))
    })
    .on_degraded_to_polling(|status| {
        println!("⚠️  Degraded to polling at {}", status.last_transition_at_ms)
    })
    .build();

    let _events = manager.subscribe(|message: &ChatMessage| {
        println!("📨 {} from {}: {}", message.id, message.user, message.body)
    });
    let _status = manager.subscribe_status(|status| {
        println!(
            "🔌 {} (connected: {}, error: {:?})",
            status.mode, status.is_connected, status.last_error
        )
    });

    println!("✅ Starting: WebSocket and SSE will fail, polling should take over\n");
    manager.start().await;

    // Let a few poll cycles and one upgrade probe run
    tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;

    println!("\n✅ Last cursor: {:?}", manager.cursor());
    manager.stop();
    println!("✅ Stopped in mode {}", manager.status().mode);

    println!("\n🎉 Demo completed!");
    Ok(())
}
