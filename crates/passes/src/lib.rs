//! One-time download passes.
//!
//! A pass is an opaque 256-bit random identifier handed to a client after
//! its token passed device validation. It lives in the store until it is
//! consumed by a download or its TTL runs out, whichever comes first, and
//! only one of the two ever happens.

mod store;

pub use store::PassStore;
