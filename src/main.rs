use std::sync::Arc;

use bytes::Bytes;
use chat_client::filter;
use chat_client::store::MemoryNetwork;
use chat_client::{MessageDraft, Session, SessionConfig};
use chrono::Local;
use clap::Parser;
use log::{info, warn};

// A walk through one conversation between two actors on an in-memory network.
//
// Usage:
//   cargo run
//   cargo run -- --message "hello" --partner-name bob
//   cargo run -- --config session.json --private

#[derive(Parser)]
#[command(name = "chat-client")]
#[command(about = "Chat client demo on an in-memory object store")]
struct Cli {
    /// JSON session config; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<String>,

    #[arg(long, default_value = "alice")]
    name: String,

    #[arg(long, default_value = "bob")]
    partner_name: String,

    #[arg(short, long, default_value = "hello there")]
    message: String,

    /// Talk in a private conversation instead of the channel.
    #[arg(short, long)]
    private: bool,
}

const DEMO_PNG: &[u8] = b"\x89PNG\r\n\x1a\n-demo-";

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "{} [{:<5}] [{}] - {}",
                Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => SessionConfig::from_json_file(path)?,
        None => SessionConfig::default(),
    };

    let network = MemoryNetwork::new();
    let alice = session_for(&network, "actor-alice", config.clone())?;
    let bob = session_for(&network, "actor-bob", config)?;

    alice.claim_username(&cli.name).await?;
    bob.claim_username(&cli.partner_name).await?;
    info!("Alice connected as {}", alice.connect().await?);
    info!("Bob connected as {}", bob.connect().await?);

    let Some(partner) = alice.find_actor(&cli.partner_name).await? else {
        anyhow::bail!("nobody is called {}", cli.partner_name);
    };
    let alice_scope = if cli.private {
        alice.messages().private_with(&partner)
    } else {
        alice.messages().channel()
    };
    let bob_scope = if cli.private {
        bob.messages().private_with(alice.me())
    } else {
        bob.messages().channel()
    };

    alice.profiles().save_name("Alice").await?;
    alice
        .messages()
        .send_with_image(
            MessageDraft::text(cli.message.clone()).with_location("Lisbon"),
            Bytes::from_static(DEMO_PNG),
            &alice_scope,
        )
        .await?;

    let feed = bob.messages().feed(bob_scope).await?.get();
    bob.messages().prefetch_images(&feed);
    info!("Places mentioned: {:?}", filter::feed_locations(&feed));
    for note in &feed {
        let author = note.actor.as_deref().map(|a| bob.display_name(a));
        info!(
            "[{}] {}: {}",
            note.published.map(|p| p.to_rfc3339()).unwrap_or_default(),
            author.unwrap_or_default(),
            note.content
        );

        let Some(id) = note.id.as_deref() else {
            continue;
        };
        bob.likes().toggle(id).await?;
        let readers = bob.receipts().mount(id).await?.get();
        let likes = alice.likes().view(id).await?.get();
        info!(
            "  {} like(s), read by {:?}",
            likes.count,
            bob.receipts().reader_names(&readers).await
        );

        if let Some(image) = &note.image {
            match bob.content().get_or_fetch(&image.magnet).await {
                Ok(handle) => info!("  attachment {} ({})", handle.uri(), handle.media_type().mime()),
                Err(e) => warn!("  attachment unavailable: {e}"),
            }
        }
    }

    let alice_name = bob.profiles().name(alice.me()).await?.get();
    info!("Alice's profile name: {}", alice_name.unwrap_or_default());
    Ok(())
}

fn session_for(
    network: &Arc<MemoryNetwork>,
    actor: &str,
    config: SessionConfig,
) -> Result<Session, anyhow::Error> {
    let store = Arc::new(network.connect_as(actor));
    Ok(Session::builder()
        .with_store(store.clone())
        .with_media(store)
        .with_registry(network.registry())
        .with_config(config)
        .build()?)
}
