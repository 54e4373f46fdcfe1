#[cfg(feature = "provider-replicate")]
pub mod replicate;
