//! Common `kprovider` imports for downstream crates.

pub use crate::{
    CompletionRequest, GenerationProvider, GenerationRequest, ImageInput, MediaUrl,
    ProviderError, ProviderErrorKind, ProviderFuture,
};
pub use kcommon::{BoxFuture, ParameterBag};
