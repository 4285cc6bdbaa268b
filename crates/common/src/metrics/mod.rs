//! Metrics and observability utilities
//!
//! Provides counters and histograms for the consolidation engine
//! with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Metrics prefix for all Mosaic metrics
pub const METRICS_PREFIX: &str = "mosaic";

/// Register all metric descriptions
pub fn register_metrics() {
    // Search metrics
    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of sub-queries sent to vector stores"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Multi-query search latency in seconds"
    );

    describe_counter!(
        format!("{}_search_results_total", METRICS_PREFIX),
        Unit::Count,
        "Total hits returned by vector stores"
    );

    // Consolidation metrics
    describe_counter!(
        format!("{}_consolidation_inputs_total", METRICS_PREFIX),
        Unit::Count,
        "Items entering a merge"
    );

    describe_counter!(
        format!("{}_consolidation_outputs_total", METRICS_PREFIX),
        Unit::Count,
        "Items surviving a merge"
    );

    // Enrichment metrics
    describe_histogram!(
        format!("{}_enrichment_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Context enrichment latency in seconds"
    );

    describe_counter!(
        format!("{}_enrichment_windows_total", METRICS_PREFIX),
        Unit::Count,
        "Context windows fetched and stitched"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record multi-query search metrics
pub fn record_search(duration_secs: f64, search_type: &str, queries: usize, result_count: usize) {
    counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        "search_type" => search_type.to_string()
    )
    .increment(queries as u64);

    histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        "search_type" => search_type.to_string()
    )
    .record(duration_secs);

    counter!(
        format!("{}_search_results_total", METRICS_PREFIX),
        "search_type" => search_type.to_string()
    )
    .increment(result_count as u64);
}

/// Helper to record a merge (`flat` or `hierarchical`)
pub fn record_consolidation(kind: &str, inputs: usize, outputs: usize) {
    counter!(
        format!("{}_consolidation_inputs_total", METRICS_PREFIX),
        "kind" => kind.to_string()
    )
    .increment(inputs as u64);

    counter!(
        format!("{}_consolidation_outputs_total", METRICS_PREFIX),
        "kind" => kind.to_string()
    )
    .increment(outputs as u64);
}

/// Helper to record context enrichment metrics
pub fn record_enrichment(duration_secs: f64, windows: usize) {
    histogram!(format!("{}_enrichment_duration_seconds", METRICS_PREFIX)).record(duration_secs);

    counter!(format!("{}_enrichment_windows_total", METRICS_PREFIX)).increment(windows as u64);
}
