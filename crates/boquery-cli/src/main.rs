//! Boquery Command-Line Client
//!
//! Loads pages of business objects from a SQLite database described by a
//! JSON class schema, or shows the SQL a load would run.

mod executor;
mod formatter;

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use executor::QueryRequest;
use formatter::OutputFormat;

/// Boquery Command-Line Client
#[derive(Parser, Debug)]
#[command(name = "boquery")]
#[command(version, about = "Query business objects stored in SQLite")]
pub struct Args {
    /// JSON file holding the class definitions
    #[arg(short = 's', long, global = true, default_value = "classes.json")]
    pub schema: PathBuf,

    /// SQLite database file
    #[arg(short = 'd', long, global = true, default_value = "data.sqlite")]
    pub db: PathBuf,

    /// Output format
    #[arg(long, global = true, default_value = "table", value_enum)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a page of objects and print it with the total match count
    Query(LoadArgs),
    /// Print the SQL a load would run
    Explain(LoadArgs),
    /// List the registered classes
    Classes,
}

#[derive(ClapArgs, Debug)]
pub struct LoadArgs {
    /// Class to load
    pub class: String,

    /// Criteria, e.g. "Surname LIKE 'S%' AND Owner.Make = 'Ford'"
    #[arg(short = 'w', long = "where")]
    pub criteria: Option<String>,

    /// Order criteria, e.g. "Surname DESC, FirstName"
    #[arg(short = 'o', long)]
    pub order: Option<String>,

    /// Zero-based index of the first record to load
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub first: i64,

    /// Maximum records to load; negative loads all
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub limit: i64,
}

impl LoadArgs {
    fn request(&self) -> QueryRequest<'_> {
        QueryRequest {
            class_name: &self.class,
            criteria: self.criteria.as_deref(),
            order: self.order.as_deref(),
            first: self.first,
            limit: self.limit,
        }
    }
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("boquery_core=info")),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let accessor = executor::open_accessor(&args.schema, &args.db)?;
    let formatter = formatter::create_formatter(args.format);

    let output = match &args.command {
        Command::Query(load) => executor::execute_query(&accessor, &load.request(), &*formatter)?,
        Command::Explain(load) => executor::explain(&accessor, &load.request())?,
        Command::Classes => executor::list_classes(&accessor, &*formatter),
    };
    println!("{}", output);
    Ok(())
}
