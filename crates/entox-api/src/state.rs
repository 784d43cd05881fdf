//! Application state management

use entox_core::AppConfig;
use entox_extractor::NlpPipeline;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// NLP pipeline, built once at startup and shared read-only
    pub pipeline: Arc<dyn NlpPipeline>,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Relations returned since start
    pub relation_count: AtomicU64,
}

impl AppState {
    pub fn new(config: AppConfig, pipeline: Arc<dyn NlpPipeline>) -> Self {
        Self {
            config,
            pipeline,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            relation_count: AtomicU64::new(0),
        }
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn record_relations(&self, count: usize) {
        self.relation_count.fetch_add(count as u64, Ordering::SeqCst);
    }

    pub fn get_relation_count(&self) -> u64 {
        self.relation_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Ready once the pipeline reports at least one entity label
    pub fn is_ready(&self) -> bool {
        !self.pipeline.labels().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entox_extractor::TreebankPipeline;

    #[test]
    fn test_ready_follows_pipeline_labels() {
        let pipeline = TreebankPipeline::new(Vec::new());
        let state = AppState::new(AppConfig::default(), Arc::new(pipeline.clone()));
        assert!(state.is_ready());

        let state = AppState::new(AppConfig::default(), Arc::new(pipeline.with_labels(Vec::new())));
        assert!(!state.is_ready());
        assert_eq!(state.get_relation_count(), 0);
    }
}
