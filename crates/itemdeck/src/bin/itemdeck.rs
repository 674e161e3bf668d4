//! Build the repository and run one listing query.
//!
//! Usage: itemdeck [SEARCH] [PAGE] [PAGE_SIZE]
//!
//! Settings come from `ITEMDECK_*` environment variables (a `.env` file in
//! the working directory is loaded first). The page is printed as JSON.

use std::sync::Arc;

use itemdeck::{CallContext, ItemRepository, JsonLinesLog, RepositoryConfig};

fn main() {
    // Load .env file
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(error) = run() {
        eprintln!("itemdeck: {error}");
        std::process::exit(1);
    }
}

fn run() -> itemdeck::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let search = args.first().map(String::as_str).unwrap_or("");

    let config = RepositoryConfig::from_env()?;
    let request = config.page_request(
        args.get(1).map(String::as_str),
        args.get(2).map(String::as_str),
    )?;

    let repository = ItemRepository::open(config.clone())?;

    // Keep the journal alive until the query has been recorded.
    let journal = if config.audit.enabled {
        let journal = Arc::new(JsonLinesLog::open(&config.audit.log_dir)?);
        journal.prune(config.retention())?;
        repository.add_observer(journal.clone());
        Some(journal)
    } else {
        None
    };

    let ctx = CallContext {
        user_agent: Some(format!("itemdeck-cli/{}", env!("CARGO_PKG_VERSION"))),
        ..CallContext::default()
    };
    let page = repository.list_items(request, search, &ctx)?;
    println!("{}", serde_json::to_string_pretty(&page)?);

    if let Some(journal) = journal {
        journal.flush()?;
    }
    Ok(())
}
