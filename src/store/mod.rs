pub mod gateway;
pub mod payments;

pub use gateway::{BackendError, RedisStore, SharedStore};
pub use payments::PaymentStore;
