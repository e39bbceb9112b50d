mod client;

pub use client::WhoisClient;
