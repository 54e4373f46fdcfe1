//! Model catalog, parameter schema and request assembly for the kiln media bot core.
//!
//! ```rust
//! use kcatalog::{MediaType, ModelCatalog, ModelDefinition};
//!
//! let catalog = ModelCatalog::builder()
//!     .model(ModelDefinition::new("flux", "black-forest-labs/flux-dev", MediaType::Image))
//!     .build()
//!     .expect("catalog should build");
//!
//! assert!(catalog.has_model("flux"));
//! ```

mod assembly;
mod catalog;
mod error;
mod model;
mod params;

pub use assembly::{
    AssembledRequest, AssemblyInput, assemble_request, generation_cost, resolve_aspect_ratio,
    resolve_num_outputs, sanitize_parameters,
};
pub use catalog::{ModelCatalog, ModelCatalogBuilder, load_entries, parse_entries};
pub use error::{CatalogError, CatalogErrorKind, ParameterError, ParameterErrorKind};
pub use model::{
    CreditPackage, DEFAULT_MAX_IMAGES, MediaType, ModelDefinition, ParamType, Parameter,
    PromptTemplate, ProviderEntry, StyleTemplate,
};

pub mod prelude {
    pub use crate::{
        AssembledRequest, AssemblyInput, CatalogError, CatalogErrorKind, CreditPackage,
        MediaType, ModelCatalog, ModelDefinition, ParamType, Parameter, ParameterError,
        ParameterErrorKind, PromptTemplate, ProviderEntry, StyleTemplate, assemble_request,
    };
}
