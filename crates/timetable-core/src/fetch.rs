//! The `Fetcher` trait — where raw payloads come from.

use std::future::Future;

use crate::raw::RawPayload;

/// Produces a fresh [`RawPayload`] from upstream.
///
/// Implementations perform the whole remote chain (credential exchange, then
/// data request) as one unit: the second call is never issued if the first
/// fails, and any failure is returned as `Self::Error`.
pub trait Fetcher: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn fetch(&self) -> impl Future<Output = Result<RawPayload, Self::Error>> + Send + '_;
}
