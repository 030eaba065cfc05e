pub mod address;
pub mod config;
pub mod error;
pub mod http;
pub mod leads;
pub mod pipeline;
pub mod postcode;
pub mod pricing;
pub mod telemetry;
