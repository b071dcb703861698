use std::time::Duration;

/// Default wait before a freshly created payout is auto-processed.
pub const DEFAULT_PROCESSING_DELAY: Duration = Duration::from_secs(5);
/// Default cap on the number of payouts returned by a merchant listing.
pub const DEFAULT_LIST_PAGE_SIZE: usize = 50;
/// Default bound on a single balance or ledger request.
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime knobs for [`crate::application::service::PayoutService`] and the
/// HTTP gateways.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub processing_delay: Duration,
    pub list_page_size: usize,
    pub gateway_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            processing_delay: DEFAULT_PROCESSING_DELAY,
            list_page_size: DEFAULT_LIST_PAGE_SIZE,
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }
}

impl ServiceConfig {
    pub fn with_processing_delay(mut self, delay: Duration) -> Self {
        self.processing_delay = delay;
        self
    }

    /// Clamped to at least one.
    pub fn with_list_page_size(mut self, size: usize) -> Self {
        self.list_page_size = size.max(1);
        self
    }

    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }
}
