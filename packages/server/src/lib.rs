//! calcbus Server: synchronous calculator API over an asynchronous message bus.
//!
//! A caller hits an HTTP endpoint, the gateway publishes the request to the
//! bus and blocks on a correlation-keyed waiter, a worker computes the result
//! and publishes a reply, and the dispatcher resolves the waiter. The
//! correlation registry in [`correlation`] is the heart of the design; the
//! rest is glue around it.

pub mod bus;
pub mod calculator;
pub mod correlation;
pub mod dispatcher;
pub mod gateway;
pub mod network;
pub mod worker;

pub use bus::InMemoryBus;
pub use correlation::{CorrelationRegistry, DuplicateCorrelationId, WaitError, Waiter};
pub use dispatcher::ResponseDispatcher;
pub use gateway::{GatewayError, RequestGateway};
pub use worker::Worker;

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
