//! Generation provider contract and adapters for the kiln media bot core.
//!
//! ```rust
//! use kprovider::{CompletionRequest, GenerationRequest};
//!
//! let generation = GenerationRequest::new("a lighthouse in fog").with_num_outputs(2);
//! let completion = CompletionRequest::new("google/gemini-2.5-flash", "hello");
//!
//! assert!(generation.validate().is_ok());
//! assert!(completion.validate().is_ok());
//! ```

pub mod adapters;
mod error;
mod model;
pub mod prelude;
mod provider;

pub use error::{ProviderError, ProviderErrorKind};
pub use model::{
    ASPECT_RATIO_KEY, CompletionRequest, DEFAULT_IMAGE_PARAMETER, GenerationRequest, ImageInput,
    MediaUrl, NUM_OUTPUTS_KEY, PROMPT_KEY, media_urls_from_output, text_from_output,
};
pub use provider::{GenerationProvider, ProviderFuture};
