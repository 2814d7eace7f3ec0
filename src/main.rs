//! trade-options: dropdown and duration lookups for the strategy editor.
//!
//! Command-line front end over the workspace libraries:
//! 1. Resolves offered duration units for a symbol and trade type
//! 2. Lists purchase choices for a trade type
//! 3. Walks the cascading market → trade-type dropdowns
//! 4. Manages stored API tokens

mod config;

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use tokio::time::timeout;
use tracing::{error, info, warn};

use common::{Error, ResolverConfig, TokenEntry};
use contracts_client::{BinaryWsApi, ContractsApi, RateLimiter};
use durations::{
    ContractsCache, DurationResolver, JsonFileStore, KeyValueStore, StorageTokenStore, TokenStore,
};
use trade_options::{filter_purchase_choices, DropdownField, FieldSelections, MarketTree};

/// Trade option lookups
#[derive(Parser)]
#[command(name = "trade-options", about = "Trade option and duration lookups")]
struct Cli {
    /// Path to config.toml (defaults to ./config.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Duration units offered for a symbol and trade type.
    Durations {
        #[arg(long)]
        symbol: String,
        /// Trade type (e.g. risefall) or contract category (e.g. callput).
        #[arg(long)]
        contract_type: String,
    },
    /// Purchasable sides of a trade type.
    PurchaseChoices {
        #[arg(long)]
        trade_type: String,
        /// `both`, or one side's contract type (e.g. CALL).
        #[arg(long, default_value = "both")]
        contract_type: String,
    },
    /// Cascading dropdown options for the given selections.
    Options {
        #[arg(long)]
        market: Option<String>,
        #[arg(long)]
        submarket: Option<String>,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Stored API tokens.
    Tokens {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    List,
    Add {
        #[arg(long)]
        token: String,
        #[arg(long)]
        account_name: String,
    },
    Clear,
}

struct App {
    cfg: ResolverConfig,
    api: Arc<dyn ContractsApi>,
    tokens: Arc<dyn TokenStore>,
    resolver: DurationResolver,
}

impl App {
    fn build(cfg: ResolverConfig) -> Result<Self, Error> {
        let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(&cfg.store_path)?);
        let tokens: Arc<dyn TokenStore> = Arc::new(StorageTokenStore::new(store.clone()));
        let api: Arc<dyn ContractsApi> = Arc::new(BinaryWsApi::new(
            cfg.connection_url(),
            RateLimiter::with_limit(cfg.requests_per_sec),
        ));
        let cache = ContractsCache::load(store, Arc::new(cfg.catalog.clone()));
        let resolver =
            DurationResolver::new(api.clone(), tokens.clone(), cache, cfg.cache_ttl_secs);

        Ok(Self {
            cfg,
            api,
            tokens,
            resolver,
        })
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.cfg.request_timeout_secs)
    }

    async fn durations(&self, symbol: &str, contract_type: &str) -> Result<(), Error> {
        let units = timeout(
            self.request_timeout(),
            self.resolver.resolve_durations(symbol, contract_type),
        )
        .await
        .map_err(|_| Error::Other(format!("Timed out resolving durations for {}", symbol)))??;

        let rows: Vec<_> = units
            .iter()
            .map(|u| serde_json::json!({ "label": u.label(), "value": u.code().to_string() }))
            .collect();
        print_json(&rows)
    }

    async fn options(&self, selections: FieldSelections) -> Result<(), Error> {
        let symbols = timeout(self.request_timeout(), async {
            let mut conn = self.api.connect().await?;
            let result = conn.active_symbols().await;
            conn.disconnect().await;
            result
        })
        .await
        .map_err(|_| Error::Other("Timed out fetching active symbols".into()))??;

        let tree = MarketTree::from_active_symbols(&symbols);
        info!(
            "{} markets, {} symbols",
            tree.markets.len(),
            tree.symbols().count()
        );

        let field = next_field(&selections);
        for symbol in symbols_to_warm(&tree, field, &selections) {
            if let Err(e) = self.resolver.contracts_for(&symbol).await {
                warn!("Could not load contracts for {}: {}", symbol, e);
            }
        }

        let cache = self.resolver.cache();
        let opts = field.options(&tree, cache.catalog(), cache, &selections)?;
        let mut out = serde_json::Map::new();
        out.insert(field.field_name().to_string(), serde_json::to_value(opts)?);
        print_json(&out)
    }

    /// Let background cache refreshes land before the runtime exits.
    async fn finish(&self) {
        if timeout(self.request_timeout(), self.resolver.wait_for_refreshes())
            .await
            .is_err()
        {
            warn!("Background refreshes still running at exit; abandoning them");
        }
    }

    fn tokens(&self, action: TokenAction) -> Result<(), Error> {
        match action {
            TokenAction::List => {
                let accounts: Vec<_> = self
                    .tokens
                    .token_list()
                    .into_iter()
                    .map(|t| t.account_name)
                    .collect();
                print_json(&accounts)
            }
            TokenAction::Add {
                token,
                account_name,
            } => {
                self.tokens.add_token(TokenEntry {
                    token,
                    account_name: account_name.clone(),
                })?;
                info!("Stored token for {}", account_name);
                Ok(())
            }
            TokenAction::Clear => {
                self.tokens.remove_all_tokens()?;
                info!("Cleared stored tokens");
                Ok(())
            }
        }
    }
}

/// The first field without a selection; the one the user picks next.
fn next_field(selections: &FieldSelections) -> DropdownField {
    if selections.market.is_none() {
        DropdownField::Market
    } else if selections.submarket.is_none() {
        DropdownField::Submarket
    } else if selections.symbol.is_none() {
        DropdownField::Symbol
    } else if selections.trade_type_category.is_none() {
        DropdownField::TradeTypeCategory
    } else {
        DropdownField::TradeType
    }
}

/// Symbols whose allowed categories the options of `field` depend on.
fn symbols_to_warm(
    tree: &MarketTree,
    field: DropdownField,
    selections: &FieldSelections,
) -> Vec<String> {
    let market = selections.market.as_deref().and_then(|m| tree.market(m));
    let submarket = selections.submarket.as_deref();

    match field {
        DropdownField::Market => tree.symbols().map(|s| s.symbol.clone()).collect(),
        DropdownField::Submarket | DropdownField::Symbol => market
            .into_iter()
            .flat_map(|m| m.submarkets.iter())
            .filter(|s| field == DropdownField::Submarket || Some(s.key.as_str()) == submarket)
            .flat_map(|s| s.symbols.iter().map(|x| x.symbol.clone()))
            .collect(),
        DropdownField::TradeTypeCategory => selections.symbol.iter().cloned().collect(),
        DropdownField::TradeType => Vec::new(),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Error> {
    let cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::PurchaseChoices {
            trade_type,
            contract_type,
        } => print_json(&filter_purchase_choices(
            &cfg.catalog,
            &contract_type,
            &trade_type,
        )?),
        Command::Durations {
            symbol,
            contract_type,
        } => {
            let app = App::build(cfg)?;
            let result = app.durations(&symbol, &contract_type).await;
            app.finish().await;
            result
        }
        Command::Options {
            market,
            submarket,
            symbol,
            category,
        } => {
            let selections = FieldSelections {
                market,
                submarket,
                symbol,
                trade_type_category: category,
            };
            let app = App::build(cfg)?;
            let result = app.options(selections).await;
            app.finish().await;
            result
        }
        Command::Tokens { action } => App::build(cfg)?.tokens(action),
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "trade_options_cli=info,durations=info,contracts_client=info,trade_options=info"
                    .into()
            }),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
