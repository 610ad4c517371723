//! Concrete transfer transports.
//!
//! Two implementations of the [`Transport`](super::Transport) seam:
//!
//! - [`DirTransport`]: serves archives from a local or mounted directory
//!   (a host-exported share)
//! - [`HttpTransport`]: streams archives from an HTTP endpoint
//!
//! Both run the actual byte shuffling on a worker thread and deliver
//! completion through the transfer's oneshot, so the reconciler's await
//! point never blocks an executor thread.

mod dir;
mod http;

pub use dir::DirTransport;
pub use http::HttpTransport;
