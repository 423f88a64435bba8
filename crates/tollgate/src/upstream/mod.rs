//! Upstream siteverify integration.
//!
//! One form-encoded POST per request, bounded by a fixed timeout, never
//! retried. Transport and parse problems come back as [`ClientError`];
//! a `success: false` answer is a normal [`VerificationResult`].
//!
//! [`ClientError`]: tollgate_common::ClientError
//! [`VerificationResult`]: tollgate_common::VerificationResult

mod client;

pub use client::SiteVerifyClient;
