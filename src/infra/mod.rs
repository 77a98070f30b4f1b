//! Concrete HTTP clients for the provider traits in [`crate::services`].

pub mod google;
pub mod pexels;
