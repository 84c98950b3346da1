pub mod model_store;
pub mod script_io;

pub use model_store::StoreError;
