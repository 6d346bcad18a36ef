pub mod clock;
pub mod identity;
pub mod limiter;
pub mod middleware;
pub mod sliding_window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use identity::{client_identity, request_identity, UNKNOWN_CLIENT};
pub use limiter::RateLimiter;
pub use middleware::{add_rate_limit_headers, rate_limit_middleware, RateLimitGuard};
pub use sliding_window::{HitStore, InMemoryHitStore, RateLimitOptions, RateLimitResult};
