/*!
# Writers module
Contains the logic for writing the summary outputs of the reconcile command.
*/
/// Ingests the collaborator report and generates the per-type summary table
pub mod report_summary;
