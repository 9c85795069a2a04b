
/// Pairs residual false calls with candidate collections and annotates them
pub mod annotator;
/// Command line interface functionality
pub mod cli;
/// Key-based merging and subtraction of variant collections
pub mod combiner;
/// Wrappers around the external comparison engines
pub mod comparators;
/// Contains various shared data types
pub mod data_types;
/// Locus- and allele-level lookup of candidate records
pub mod matcher;
/// Combines the raw comparator partitions into the augmented one
pub mod reconciler;
/// Various utility functions that tend to be very generic
pub mod util;
/// All output writers
pub mod writers;
