pub mod backoff;
pub mod clock;
pub mod normalizer;
pub mod providers;
pub mod rate_limiter;
pub mod resolver;

pub use backoff::BackoffPolicy;
pub use clock::{Clock, ManualClock, SystemClock};
pub use providers::StreamingProvider;
pub use rate_limiter::{RateLimitConfig, RateLimiter};
pub use resolver::{ResolveOptions, Resolver, ResolverConfig};
