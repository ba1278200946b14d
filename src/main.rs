// src/main.rs
use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use std::collections::BTreeMap;

use serverlist::models::filter::{ListType, ServerFilters, ServerTags, SortOrder};
use serverlist::names::strip_name;
use serverlist::{Config, FiltersService, Result, ServersService};

/// Headless server browser: downloads the list, applies filters and prints
/// the sorted result.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Search text, e.g. `tag:drifting ~roleplay`
    #[arg(short, long, default_value = "")]
    search: String,

    /// Sort order such as `players-` or `name+`
    #[arg(long, default_value = "name+")]
    sort: SortOrder,

    /// browse, favorites, history or premium
    #[arg(long, default_value = "browse")]
    list: ListType,

    #[arg(long)]
    hide_empty: bool,

    #[arg(long)]
    hide_full: bool,

    #[arg(long)]
    max_ping: Option<u32>,

    /// Required tag; prefix with `~` to exclude it instead
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Required locale; prefix with `~` to exclude it instead
    #[arg(long = "locale")]
    locales: Vec<String>,

    #[arg(short, long, default_value = "25")]
    limit: usize,

    /// Look up a single server by address and print it as JSON
    #[arg(long)]
    server: Option<String>,
}

fn choices(values: &[String]) -> BTreeMap<String, bool> {
    values
        .iter()
        .map(|value| match value.strip_prefix('~') {
            Some(excluded) => (excluded.to_string(), false),
            None => (value.to_string(), true),
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let args = Args::parse();
    let config = Config::from_env();
    let servers = ServersService::start(config);

    if let Some(address) = &args.server {
        match servers.load_server(address).await? {
            Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            None => warn!("Server {} not found", address),
        }
        return Ok(());
    }

    if let Err(e) = servers.refresh_pins().await {
        warn!("Continuing without pinned servers: {}", e);
    }

    let mut loading = servers.loading();
    servers.refresh_servers()?;
    // a closed channel means the service is gone, nothing left to wait for
    let _ = loading.wait_for(|loading| !*loading).await;

    let filters = FiltersService::new(servers.clone());
    filters.set_list(args.list, None)?;
    filters.set_tags(ServerTags {
        tag_list: choices(&args.tags),
        locale_list: choices(&args.locales),
    })?;
    filters.set_sort_order(args.sort)?;
    filters.set_filters(ServerFilters {
        search_text: args.search.clone(),
        hide_empty: args.hide_empty,
        hide_full: args.hide_full,
        max_ping: args.max_ping,
    })?;

    let Some(id) = filters.apply_now()? else {
        return Ok(());
    };

    let mut sorted = servers.sorted();
    let _ = sorted.wait_for(|sorted| sorted.id >= id).await;
    let result = sorted.borrow().clone();

    info!("{} of {} servers match", result.endpoints.len(), servers.server_count());

    for record in servers.resolve(&result).iter().take(args.limit) {
        println!(
            "{:>4}/{:<4} {:<8} {}",
            record.data.clients,
            record.data.sv_maxclients,
            record.end_point,
            strip_name(&record.data)
        );
    }

    let snapshot = servers.tags().borrow().clone();
    let mut top_tags: Vec<_> = snapshot.tags.into_iter().collect();
    top_tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    if !top_tags.is_empty() {
        let listed: Vec<String> = top_tags
            .iter()
            .take(10)
            .map(|(tag, count)| format!("{} ({})", tag, count))
            .collect();
        println!("\nTop tags: {}", listed.join(", "));
    }

    servers.shutdown();
    Ok(())
}
