//! Sniffing an application's database calls.
//!
//! Runs a few operations against the in-memory client while a sniffer is installed and
//! logs every intercepted call. The reporter is picked from the environment (see
//! `mongodog::config`); with nothing set, calls are logged through `tracing`.
//!
//! ```sh
//! RUST_LOG=info cargo run --example sniff
//! MONGODOG_REPORTER=mongo MONGODOG_COLLECTION=mongodog_reports cargo run --example sniff
//! ```

use mongodog::doc;
use mongodog::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> mongodog::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = SnifferConfig::from_env()?;
    if std::env::var(mongodog::config::ENV_REPORTER).is_err() {
        config.reporter = ReporterKind::Logging;
    }

    let client = Client::new();
    let database = client.database("shop");
    let sniffer = Sniffer::from_config(&config, &database)?;

    println!("Sniffing with the {} reporter\n", config.reporter);
    sniffer.install();

    let orders = database.collection("orders");
    orders.insert(
        vec![
            doc! { "item" => "tea", "qty" => 2 },
            doc! { "item" => "coffee", "qty" => 1 },
            doc! { "item" => "tea", "qty" => 5 },
        ],
        Document::new(),
    )?;
    orders.update(
        doc! { "item" => "coffee" },
        doc! { "$inc" => doc! { "qty" => 1 } },
        Document::new(),
    )?;

    let tea = orders.find(doc! { "item" => "tea" }, Document::new())?.limit(10).iter()?;
    println!("Found {} tea orders", tea.len());

    let totals = orders.aggregate(
        vec![doc! { "$group" => doc! { "_id" => "$item", "qty" => doc! { "$sum" => "$qty" } } }],
        Document::new(),
    )?;
    println!("Totals: {}", totals);

    database.command("ping", Document::new())?;

    sniffer.uninstall();

    // Not reported
    orders.count()?;

    if config.reporter == ReporterKind::Mongo {
        if let Some(name) = &config.collection {
            let stored = database.collection(name.as_str()).count()?;
            println!("\n{} records stored in {}", stored, name);
        }
    }

    Ok(())
}
