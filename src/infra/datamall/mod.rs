//! Transit datasets from LTA DataMall.

mod client;

pub use client::{DatamallClient, unwrap_envelope};
