//! Command-line driver for the ticket wallet against a Postgres backend.
//!
//! ```text
//! afritix-demo list <user-id>
//! afritix-demo show <user-id> <ticket-id>
//! afritix-demo buy <user-id> <event-id> <ticket-type-id>
//! afritix-demo transfer <user-id> <ticket-id> <recipient-email>
//! ```
//!
//! Results are printed as JSON; the wallet snapshot is printed after every
//! command.

use afritix_core::environment::SystemClock;
use afritix_core::types::{EventId, TicketId, TicketTypeId, UserId};
use afritix_postgres::PostgresTicketBackend;
use afritix_tickets::{
    Config, TicketEnvironment, TicketRepository, TicketViewStore, metrics::register_ticket_metrics,
};
use anyhow::{Context, bail};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

const USAGE: &str = "usage: afritix-demo <list|show|buy|transfer> <user-id> [args...]";

fn parse_uuid(value: Option<&String>, what: &str) -> anyhow::Result<Uuid> {
    let raw = value.with_context(|| format!("missing {what}\n{USAGE}"))?;
    Uuid::parse_str(raw).with_context(|| format!("invalid {what}: {raw}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(config.log_filter())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        bail!(USAGE);
    };
    let user_id = UserId::from_uuid(parse_uuid(args.get(1), "user id")?);

    info!(
        max_connections = config.database.max_connections,
        transfer_expiry_days = config.tickets.transfer_expiry_days,
        "Configuration loaded"
    );

    let pool = config
        .database_pool_options()
        .connect(&config.database.url)
        .await
        .context("connecting to the database")?;
    let backend = PostgresTicketBackend::from_pool(pool);
    backend.migrate().await.context("running migrations")?;
    register_ticket_metrics();

    let repository = TicketRepository::new(
        Arc::new(backend),
        Arc::new(SystemClock),
        config.tickets.clone(),
    );
    let store = TicketViewStore::new(TicketEnvironment::new(Arc::new(repository)));
    store.start_session(user_id).await;

    let output = match command.as_str() {
        "list" => serde_json::to_value(store.load_tickets().await?)?,
        "show" => {
            let ticket_id = TicketId::from_uuid(parse_uuid(args.get(2), "ticket id")?);
            serde_json::to_value(store.select_ticket(ticket_id).await?)?
        },
        "buy" => {
            let event_id = EventId::from_uuid(parse_uuid(args.get(2), "event id")?);
            let ticket_type_id = TicketTypeId::from_uuid(parse_uuid(args.get(3), "ticket type id")?);
            serde_json::to_value(store.purchase_ticket(event_id, ticket_type_id).await?)?
        },
        "transfer" => {
            let ticket_id = TicketId::from_uuid(parse_uuid(args.get(2), "ticket id")?);
            let email = args.get(3).with_context(|| format!("missing recipient email\n{USAGE}"))?;
            let receipt = store.transfer_ticket(ticket_id, email.as_str()).await?;
            serde_json::json!({
                "transfer": receipt.transfer,
                "history_entry": receipt.history_entry,
            })
        },
        other => bail!("unknown command {other:?}\n{USAGE}"),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    println!("{}", store.snapshot().await.to_json()?);
    Ok(())
}
