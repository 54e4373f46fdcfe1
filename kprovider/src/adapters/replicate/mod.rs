mod auth;
mod provider;
mod transport;
mod types;

pub use auth::ReplicateAuth;
pub use provider::ReplicateProvider;
pub use transport::{ReplicateHttpTransport, ReplicateTransport};
pub use types::{
    ReplicateModelRef, ReplicatePrediction, ReplicatePredictionRequest, ReplicateStatus,
    ReplicateUrls,
};
