//! Catalog metrics.
//!
//! Counters for successful mutations and a histogram of assembled tree
//! sizes. These complement the structured logs emitted by the service.

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Successful catalog mutations, labelled by operation.
pub const CATALOG_MUTATIONS: &str = "catalog_mutations_total";

/// Nodes per assembled tree response, labelled by mode (`subtree` or `forest`).
pub const CATALOG_TREE_NODES: &str = "catalog_tree_nodes";

/// Registers all catalog metric descriptions.
///
/// Call this once at application startup after initializing the metrics recorder.
pub fn register_metrics() {
    describe_counter!(CATALOG_MUTATIONS, "Total successful catalog mutations");
    describe_histogram!(CATALOG_TREE_NODES, "Nodes in assembled tree responses");
}

/// Records a successful mutation.
pub fn record_mutation(op: &'static str) {
    counter!(CATALOG_MUTATIONS, "op" => op).increment(1);
}

/// Records the size of an assembled tree response.
#[allow(clippy::cast_precision_loss)]
pub fn record_tree_size(mode: &'static str, nodes: usize) {
    histogram!(CATALOG_TREE_NODES, "mode" => mode).record(nodes as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_a_recorder_is_a_no_op() {
        register_metrics();
        record_mutation("create_component");
        record_tree_size("forest", 7);
    }
}
