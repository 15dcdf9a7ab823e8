// marketplace/src/services/mod.rs

pub mod gateway;
pub mod order_ref;
pub mod payment_mock;
pub mod session_locks;
pub mod stripe;

pub use gateway::{build_gateway, GatewaySession, PaymentGateway};
pub use order_ref::{OrderRefGenerator, RandomOrderRefs};
pub use payment_mock::MockGateway;
pub use session_locks::UserLocks;
pub use stripe::StripeGateway;
