//! HTTP transport with retry and timeout support

pub mod client;

pub use client::{Delivery, HttpClient, HttpClientBuilder, RetryOn, USER_AGENT};
