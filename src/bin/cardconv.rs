//! cardconv - CLI tool for converting credit-card exports to MT940/CAMT.053.

use cardconv::processor::{ConvertOptions, OutputFormat, TransactionProcessor};
use cardconv::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{self, Read, Write};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cardconv")]
#[command(about = "Convert credit-card bank exports to MT940 or CAMT.053", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List supported banks and their file extensions
    Banks,

    /// Check whether a file matches a bank's expected format
    Validate {
        /// Bank key (see `banks`)
        #[arg(short, long)]
        bank: String,

        /// Input file path (or stdin if not provided)
        input: Option<String>,
    },

    /// Parse a file and print totals as JSON
    Summarize {
        /// Bank key (see `banks`)
        #[arg(short, long)]
        bank: String,

        /// Input file path (or stdin if not provided)
        input: Option<String>,
    },

    /// Convert a file into a statement document
    Convert {
        /// Bank key (see `banks`)
        #[arg(short, long)]
        bank: String,

        /// Output format (mt940, camt053)
        #[arg(short, long, default_value = "mt940")]
        format: String,

        /// Account number override (IBAN)
        #[arg(long)]
        account: Option<String>,

        /// Statement number override
        #[arg(long)]
        statement_number: Option<String>,

        /// Opening balance override
        #[arg(long)]
        opening_balance: Option<Decimal>,

        /// Input file path (or stdin if not provided)
        input: Option<String>,

        /// Output file path (or stdout if not provided)
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let processor = TransactionProcessor::new();

    match cli.command {
        Command::Banks => {
            for (key, descriptor) in processor.list_supported_banks() {
                println!(
                    "{:<14} {} ({})",
                    key,
                    descriptor.display_name,
                    descriptor.supported_extensions.join(", ")
                );
            }
        }
        Command::Validate { bank, input } => {
            let data = read_input(input.as_deref())?;
            let report = processor.validate(&data, &bank)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.valid {
                std::process::exit(1);
            }
        }
        Command::Summarize { bank, input } => {
            let data = read_input(input.as_deref())?;
            let summary = processor.summarize(&data, &bank)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Convert {
            bank,
            format,
            account,
            statement_number,
            opening_balance,
            input,
            output,
        } => {
            let format = format.parse::<OutputFormat>()?;
            let options = ConvertOptions {
                account_number: account,
                statement_number,
                opening_balance,
            };
            let data = read_input(input.as_deref())?;
            let document = processor.convert(&data, &bank, format, &options)?;
            write_output(output.as_deref(), &document)?;
        }
    }

    Ok(())
}

fn read_input(path: Option<&str>) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    match path {
        Some(path) => {
            File::open(path)?.read_to_end(&mut data)?;
        }
        None => {
            io::stdin().read_to_end(&mut data)?;
        }
    }
    Ok(data)
}

fn write_output(path: Option<&str>, document: &str) -> Result<()> {
    match path {
        Some(path) => {
            File::create(path)?.write_all(document.as_bytes())?;
        }
        None => {
            io::stdout().write_all(document.as_bytes())?;
        }
    }
    Ok(())
}
