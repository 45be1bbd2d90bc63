//! Test doubles for code built on top of [`ChatProvider`](crate::ChatProvider).

mod provider;

pub use provider::{MockProvider, MockStreamResult};
