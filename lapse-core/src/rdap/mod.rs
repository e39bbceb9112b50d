mod client;
mod types;

pub use client::{build_transport, RdapClient};
pub use types::{RdapEvent, RdapResponse};
