pub mod response;

pub use response::ListModelsResponse;
