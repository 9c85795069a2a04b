
/// Shared command line interface definitions
pub mod core;
/// Settings for the standalone combine subcommand
pub mod combine;
/// Settings for the full reconcile pipeline
pub mod reconcile;
