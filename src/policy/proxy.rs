use std::sync::atomic::{AtomicUsize, Ordering};

/// Round-robin proxy selection shared by every worker of a crawl run
#[derive(Debug, Default)]
pub struct ProxyRotator {
    proxies: Vec<String>,
    counter: AtomicUsize,
}

impl ProxyRotator {
    pub fn new(proxies: Vec<String>) -> Self {
        Self {
            proxies,
            counter: AtomicUsize::new(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    /// Index of the proxy for the next outbound request, if any are configured
    pub fn next_index(&self) -> Option<usize> {
        if self.proxies.is_empty() {
            return None;
        }
        Some(self.counter.fetch_add(1, Ordering::Relaxed) % self.proxies.len())
    }
}
