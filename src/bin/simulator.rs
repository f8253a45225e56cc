//! Headless widget simulator.
//!
//! Drives the runtime against in-memory collaborators through a scripted
//! visit: location detection, a first exchange, conversation promotion, a
//! human takeover with realtime messages, and a reload that restores the
//! visitor's state. Run with: `cargo run --bin veranda-sim`

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use serde_json::json;

use veranda_widget::content::EntryType;
use veranda_widget::conversation::backend::{InMemoryBackend, TakeoverAgent};
use veranda_widget::conversation::effects::View;
use veranda_widget::conversation::message::{Message, MessageRecord, MessageRole};
use veranda_widget::core::ids::AgentKey;
use veranda_widget::location::directory::StaticLocationDirectory;
use veranda_widget::location::types::DetectedLocation;
use veranda_widget::realtime::events::ConversationStatus;
use veranda_widget::realtime::transport::InMemoryTransport;
use veranda_widget::storage::{KeyValueStore, MemoryKeyValueStore};
use veranda_widget::{ConversationId, WidgetBackends, WidgetConfig, WidgetRuntime};

const CANONICAL: &str = "5f9d2f04-9a5e-4f8e-8a28-0e1d3c6b7a90";

fn backends(
    storage: &Arc<MemoryKeyValueStore>,
    backend: &Arc<InMemoryBackend>,
    transport: &Arc<InMemoryTransport>,
) -> WidgetBackends {
    WidgetBackends {
        storage: Arc::clone(storage) as Arc<dyn KeyValueStore>,
        backend: Arc::clone(backend) as _,
        transport: Arc::clone(transport) as _,
        directory: Arc::new(StaticLocationDirectory::new(vec![DetectedLocation {
            id: "loc-1".to_owned(),
            name: "Forge Lake".to_owned(),
            slug: Some("forge-lake".to_owned()),
            city: Some("Austin".to_owned()),
            state: Some("TX".to_owned()),
        }])),
    }
}

fn config() -> WidgetConfig {
    WidgetConfig::new(AgentKey::new("demo-agent"))
        .with_page_url("https://homes.example.com/community/forge-lake/?utm_medium=cpc")
        .with_referrer("https://www.google.com/search?q=forge+lake+homes")
        .with_read_receipt_debounce(Duration::from_millis(50))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let storage = Arc::new(MemoryKeyValueStore::new());
    let backend = Arc::new(InMemoryBackend::new());
    let transport = Arc::new(InMemoryTransport::new());

    // --- first visit -----------------------------------------------------
    let (runtime, mut effects) =
        WidgetRuntime::new(config(), backends(&storage, &backend, &transport))?;
    runtime.start().await;

    tracing::info!("visitor {} session {}", runtime.visitor_id(), runtime.session_id());
    tracing::info!(
        "entry type: {}, utm medium: {:?}",
        runtime.entry_type().as_str(),
        runtime.utm_params().utm_medium
    );
    assert_eq!(runtime.entry_type(), EntryType::Organic);

    match runtime.location() {
        Some(resolved) => tracing::info!(
            "location detected: {} (method {})",
            resolved.location.name,
            resolved.method
        ),
        None => tracing::info!("no location detected, picker visible"),
    }

    runtime.open();
    runtime.set_view(View::Messages);

    // First exchange through a local placeholder conversation.
    runtime
        .set_active_conversation(ConversationId::new_local())
        .await;
    runtime.append_local_message(Message::visitor("Do you have 3-bedroom homes?"));
    runtime.append_local_message(Message::assistant(
        "We do! Learn more: https://homes.example.com/3br or call us at (555) 123-4567.",
    ));

    // The chat endpoint created a durable conversation; adopt its id.
    let canonical = ConversationId::parse(CANONICAL);
    runtime.promote_conversation(canonical.clone())?;

    // --- human takeover over realtime ------------------------------------
    backend.set_takeover_agent(Some(TakeoverAgent {
        name: "Dana".to_owned(),
        avatar: None,
    }));
    transport.emit_status(&canonical, ConversationStatus::HumanTakeover);
    transport.emit_insert(
        &canonical,
        &MessageRecord {
            id: "m-dana-1".to_owned(),
            role: MessageRole::Assistant,
            content: "Hi, Dana here. Happy to help with floor plans!".to_owned(),
            created_at: Utc::now(),
            metadata: Some(json!({"sender_type": "human", "sender_name": "Dana"})),
        },
    );
    tokio::time::sleep(Duration::from_millis(100)).await;

    tracing::info!(
        "takeover active: {}, agent: {:?}",
        runtime.takeover_active(),
        runtime.takeover_agent().map(|agent| agent.name)
    );

    let sanitizer = runtime.sanitizer();
    for message in runtime.messages() {
        let rendered = sanitizer.strip_urls(&message.content, true);
        let rendered = sanitizer.strip_phone_numbers(&rendered, true);
        tracing::info!(
            "[{}]{} {}",
            message.role,
            if message.is_system_notice { " (notice)" } else { "" },
            rendered
        );
    }

    let mut effect_count = 0_usize;
    while effects.try_recv().is_ok() {
        effect_count += 1;
    }
    tracing::info!("host effects emitted: {effect_count}");
    runtime.dispose();
    drop(runtime);

    // --- reload: the returning visitor resumes ---------------------------
    let (runtime, _effects) =
        WidgetRuntime::new(config(), backends(&storage, &backend, &transport))?;
    runtime.start().await;
    tracing::info!(
        "after reload: conversation {:?} with {} messages",
        runtime.active_conversation().map(|id| id.to_string()),
        runtime.messages().len()
    );
    runtime.dispose();

    Ok(())
}
