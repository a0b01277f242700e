pub mod delivery;
pub mod health;
#[cfg(feature = "mock-api")]
pub mod mock;

pub use delivery::{receive_pull, receive_push};
pub use health::health_check;
#[cfg(feature = "mock-api")]
pub use mock::mock_asset;
