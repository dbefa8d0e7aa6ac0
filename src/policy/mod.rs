//! Request policy: pacing, retries and proxy rotation
//!
//! Policy decisions are local and never fail; they only allow, deny or
//! delay a request. The crawl engine consults them around every dispatch.

mod proxy;
mod rate_limit;
mod retry;

pub use proxy::ProxyRotator;
pub use rate_limit::{jitter_for, spacing_for, DomainState, MAX_SPACING, RateLimiter};
pub use retry::{RetryPolicy, RetryState, MAX_RETRY_DELAY, TRANSPORT_FAILURE};
