// Thu Oct 15 2026 - Alex

pub mod short_lived_cache;
#[cfg(test)]
pub mod testing;

pub use short_lived_cache::{Release, ShortLivedCache};
