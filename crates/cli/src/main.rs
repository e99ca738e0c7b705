mod backend;
mod commands;
mod logging;
mod serve;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Farm-to-shelf traceability for agricultural produce.
#[derive(Parser)]
#[command(
    name = "krishi",
    version,
    about = "Farm-to-shelf traceability for agricultural produce"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log filter directive, e.g. `debug` or `krishi_trace=trace`
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// JSON file backing the document store (in-memory when omitted)
    #[arg(long, global = true, env = "KRISHI_DATA")]
    data: Option<PathBuf>,

    /// JSON array of price references replacing the built-in table
    #[arg(long, global = true)]
    prices: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port to listen on
        #[arg(long, env = "KRISHI_PORT", default_value = "8080")]
        port: u16,
        /// Load the demo dataset on start when the store is empty
        #[arg(long)]
        seed_demo: bool,
    },

    /// Show the provenance trail for a lookup code
    Trace {
        /// Record id printed on the product, e.g. RET001
        code: String,
    },

    /// Show reference prices for a commodity
    Price {
        /// Commodity name (case-insensitive, partial names allowed)
        commodity: String,
    },

    /// Suggest commodity names matching a partial name
    Search {
        /// At least two characters
        query: String,
    },

    /// List every commodity in the price table
    Prices,

    /// List the records an actor has authored
    Records {
        /// Actor uid or email
        actor: String,
    },

    /// Show an actor's dashboard summary
    Summary {
        /// Actor uid or email
        actor: String,
    },

    /// Write the demo dataset into the --data file
    Seed,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = match cli.command {
        Commands::Serve { .. } => logging::SERVE_FILTER,
        _ => logging::COMMAND_FILTER,
    };
    logging::init(cli.log_level.as_deref(), default_filter, cli.quiet);

    let ctx = commands::Context {
        data: cli.data,
        prices: cli.prices,
        output: cli.output,
        quiet: cli.quiet,
    };

    let result = match cli.command {
        Commands::Serve { port, seed_demo } => commands::block_on(serve::start_server(
            port,
            ctx.data.clone(),
            ctx.prices.clone(),
            seed_demo,
        )),
        Commands::Trace { code } => commands::block_on(commands::trace::cmd_trace(&ctx, &code)),
        Commands::Price { commodity } => commands::prices::cmd_price(&ctx, &commodity),
        Commands::Search { query } => commands::prices::cmd_search(&ctx, &query),
        Commands::Prices => commands::prices::cmd_prices(&ctx),
        Commands::Records { actor } => {
            commands::block_on(commands::records::cmd_records(&ctx, &actor))
        }
        Commands::Summary { actor } => {
            commands::block_on(commands::records::cmd_summary(&ctx, &actor))
        }
        Commands::Seed => commands::block_on(commands::seed::cmd_seed(&ctx)),
    };

    if let Err(e) = result {
        report_error(&e.to_string(), cli.output, cli.quiet);
        process::exit(1);
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
