//! Metrics (feature `metrics`) and tracing spans (feature `tracing`).

#[cfg(feature = "metrics")]
pub use self::otel::{TidepoolMetrics, METRICS};

#[cfg(feature = "metrics")]
mod otel {
    use once_cell::sync::Lazy;
    use opentelemetry::metrics::{Counter, Histogram, MeterProvider};
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::{Encoder, Registry, TextEncoder};
    use std::time::Duration;

    pub static METRICS: Lazy<TidepoolMetrics> = Lazy::new(TidepoolMetrics::init);

    pub struct TidepoolMetrics {
        registry: Registry,
        _provider: Option<SdkMeterProvider>,
        pub queries_total: Counter<u64>,
        pub query_errors_total: Counter<u64>,
        pub query_duration: Histogram<f64>,
        pub connection_wait_duration: Histogram<f64>,
        pub documents_inserted_total: Counter<u64>,
    }

    impl TidepoolMetrics {
        pub fn init() -> Self {
            let registry = Registry::new();
            // Without an exporter the instruments still exist; they are no-ops.
            let provider = match opentelemetry_prometheus::exporter()
                .with_registry(registry.clone())
                .build()
            {
                Ok(exporter) => Some(SdkMeterProvider::builder().with_reader(exporter).build()),
                Err(e) => {
                    log::warn!("prometheus exporter unavailable, metrics disabled: {}", e);
                    None
                }
            };
            let meter = match &provider {
                Some(p) => p.meter("tidepool"),
                None => opentelemetry::global::meter("tidepool"),
            };

            let queries_total = meter
                .u64_counter("tidepool_queries_total")
                .with_description("Total queries executed")
                .build();

            let query_errors_total = meter
                .u64_counter("tidepool_query_errors_total")
                .with_description("Queries that returned an error")
                .build();

            let query_duration = meter
                .f64_histogram("tidepool_query_duration_seconds")
                .with_description("Duration of queries")
                .build();

            let connection_wait_duration = meter
                .f64_histogram("tidepool_connection_wait_seconds")
                .with_description("Time spent establishing connections")
                .build();

            let documents_inserted_total = meter
                .u64_counter("tidepool_documents_inserted_total")
                .with_description("Documents inserted, by collection")
                .build();

            Self {
                registry,
                _provider: provider,
                queries_total,
                query_errors_total,
                query_duration,
                connection_wait_duration,
                documents_inserted_total,
            }
        }

        pub fn record_query_duration(&self, elapsed: Duration) {
            self.queries_total.add(1, &[]);
            self.query_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_query_error(&self) {
            self.query_errors_total.add(1, &[]);
        }

        pub fn record_connection_wait(&self, elapsed: Duration) {
            self.connection_wait_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_document_inserted(&self, collection: &str) {
            self.documents_inserted_total
                .add(1, &[KeyValue::new("collection", collection.to_string())]);
        }

        /// Current metrics in the Prometheus text exposition format.
        pub fn render(&self) -> String {
            let mut buf = Vec::new();
            if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buf) {
                log::warn!("failed to encode metrics: {}", e);
                return String::new();
            }
            String::from_utf8(buf).unwrap_or_default()
        }
    }

}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::{info_span, Span};

    /// Longest statement prefix recorded on a span.
    const MAX_STATEMENT_LEN: usize = 120;

    pub fn acquire_connection_span() -> Span {
        info_span!("tidepool.connect")
    }

    pub fn execute_query_span(query: &str) -> Span {
        info_span!("tidepool.query", statement = %truncate(query.trim()))
    }

    pub fn insert_document_span(collection: &str) -> Span {
        info_span!("tidepool.insert_one", collection = %collection)
    }

    fn truncate(statement: &str) -> &str {
        match statement.char_indices().nth(MAX_STATEMENT_LEN) {
            Some((idx, _)) => &statement[..idx],
            None => statement,
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_truncate_statement() {
            assert_eq!(truncate("SELECT 1"), "SELECT 1");
            let long = "x".repeat(MAX_STATEMENT_LEN + 10);
            assert_eq!(truncate(&long).len(), MAX_STATEMENT_LEN);
        }
    }
}
