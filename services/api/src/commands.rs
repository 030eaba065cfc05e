use clap::Args;
use propvalue::address::{FormattedAddress, Resolution};
use propvalue::config::AppConfig;
use propvalue::error::AppError;
use propvalue::pipeline::{Estimate, ValuationPipeline};
use propvalue::postcode::normalize;
use propvalue::pricing::{
    calculate_offer, BatchEstimate, BatchValuationImporter, PropertyType,
};
use propvalue::telemetry;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct PostcodeArgs {
    /// Postcode in any casing or spacing, e.g. "sw1a1aa"
    pub(crate) postcode: String,
}

#[derive(Args, Debug)]
pub(crate) struct AddressArgs {
    pub(crate) postcode: String,
    /// Use a single provider (paf, geography, geocoding) instead of the chain
    #[arg(long)]
    pub(crate) provider: Option<String>,
    /// Print the raw JSON response
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct EstimateArgs {
    pub(crate) postcode: String,
    /// detached, semi-detached, terraced, flat, or other
    #[arg(long, value_parser = parse_property_type, default_value = "other")]
    pub(crate) property_type: PropertyType,
    #[arg(long, default_value_t = 3)]
    pub(crate) bedrooms: u8,
    /// Print the raw JSON response
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct OfferArgs {
    /// Market value in whole pounds
    #[arg(allow_negative_numbers = true)]
    pub(crate) market_value: i64,
}

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// CSV with Postcode, Property Type, and Bedrooms columns
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Print the raw JSON response
    #[arg(long)]
    pub(crate) json: bool,
}

fn parse_property_type(raw: &str) -> Result<PropertyType, String> {
    Ok(PropertyType::parse(raw))
}

/// Load config and telemetry the same way `serve` does, then build the providers.
fn pipeline() -> Result<ValuationPipeline, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    Ok(ValuationPipeline::from_config(&config.providers)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
    println!("{rendered}");
    Ok(())
}

pub(crate) fn run_postcode(args: PostcodeArgs) -> Result<(), AppError> {
    let postcode = normalize(&args.postcode)?;
    println!(
        "{postcode} (outcode {}, incode {})",
        postcode.outcode(),
        postcode.incode()
    );
    Ok(())
}

pub(crate) async fn run_address(args: AddressArgs) -> Result<(), AppError> {
    let pipeline = pipeline()?;
    let resolution = match args.provider.as_deref() {
        Some(provider) => pipeline.resolver.resolve_with(provider, &args.postcode).await?,
        None => pipeline.resolver.resolve(&args.postcode).await?,
    };

    if args.json {
        return print_json(&resolution);
    }
    render_resolution(&resolution);
    Ok(())
}

fn render_resolution(resolution: &Resolution) {
    println!(
        "{} address(es) from {}",
        resolution.addresses.len(),
        resolution.provider
    );
    for address in &resolution.addresses {
        println!("- {}", describe_address(address));
    }
}

fn describe_address(address: &FormattedAddress) -> String {
    let mut parts = vec![address.address_line1.clone()];
    parts.extend(address.address_line2.clone());
    parts.push(address.town.clone());
    parts.extend(address.county.clone());
    let mut line = parts.join(", ");
    if address.approximate {
        line.push_str(" (approximate)");
    }
    line
}

pub(crate) async fn run_estimate(args: EstimateArgs) -> Result<(), AppError> {
    let pipeline = pipeline()?;
    let estimate = pipeline
        .estimate(&args.postcode, args.property_type, args.bedrooms)
        .await?;

    if args.json {
        return print_json(&estimate);
    }
    render_estimate(&estimate);
    Ok(())
}

fn render_estimate(estimate: &Estimate) {
    let price = &estimate.price;
    println!(
        "{} | {} | {} bedroom(s)",
        estimate.postcode, estimate.property_type, estimate.bedrooms
    );
    println!(
        "- Estimated value £{} (range £{} to £{}, {:?} data as of {})",
        price.average_price, price.min_price, price.max_price, price.source, price.last_updated
    );
    println!(
        "- Cash offer £{} ({}% below, £{} discount)",
        estimate.offer.offer_price, estimate.offer.discount_percentage, estimate.offer.discount_amount
    );
}

pub(crate) fn run_offer(args: OfferArgs) -> Result<(), AppError> {
    let offer = calculate_offer(args.market_value)?;
    println!(
        "Cash offer £{} on £{} (discount £{}, {}%)",
        offer.offer_price, args.market_value, offer.discount_amount, offer.discount_percentage
    );
    Ok(())
}

pub(crate) async fn run_batch(args: BatchArgs) -> Result<(), AppError> {
    let rows = BatchValuationImporter::rows_from_path(&args.csv)?;
    let pipeline = pipeline()?;
    let estimates = BatchValuationImporter::estimate(&pipeline.pricing, rows).await;

    if args.json {
        return print_json(&estimates);
    }
    render_batch(&estimates);
    Ok(())
}

fn render_batch(estimates: &[BatchEstimate]) {
    let failed = estimates.iter().filter(|row| row.error.is_some()).count();
    println!(
        "Valued {} of {} row(s)",
        estimates.len() - failed,
        estimates.len()
    );
    for row in estimates {
        match (&row.price, &row.offer, &row.error) {
            (Some(price), Some(offer), _) => println!(
                "- line {}: {} {} {}-bed -> £{} (offer £{})",
                row.line,
                row.postcode,
                row.property_type,
                row.bedrooms.unwrap_or_default(),
                price.average_price,
                offer.offer_price
            ),
            (_, _, Some(error)) => println!("- line {}: skipped ({error})", row.line),
            _ => println!("- line {}: no estimate", row.line),
        }
    }
}
