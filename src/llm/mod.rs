pub mod provider;
pub mod together;
pub mod types;

pub use provider::CompletionModel;
pub use together::TogetherProvider;
pub use types::CompletionRequest;
