use crate::commands::{
    run_address, run_batch, run_estimate, run_offer, run_postcode, AddressArgs, BatchArgs,
    EstimateArgs, OfferArgs, PostcodeArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use propvalue::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "propvalue",
    about = "Look up UK addresses, estimate property values, and quote cash offers",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Normalize a raw postcode into OUTCODE INCODE form
    Postcode(PostcodeArgs),
    /// Resolve a postcode to addresses through the provider chain
    Address(AddressArgs),
    /// Estimate a property's value and the matching cash offer
    Estimate(EstimateArgs),
    /// Quote the cash offer for a known market value
    Offer(OfferArgs),
    /// Estimate every row of a CSV export
    Batch(BatchArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Postcode(args) => run_postcode(args),
        Command::Address(args) => run_address(args).await,
        Command::Estimate(args) => run_estimate(args).await,
        Command::Offer(args) => run_offer(args),
        Command::Batch(args) => run_batch(args).await,
    }
}
