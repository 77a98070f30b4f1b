mod client;

pub use client::PexelsClient;
