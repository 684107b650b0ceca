pub mod error;
pub mod memory;
pub mod traits;

pub use error::StoreError;
pub use memory::{MemoryNetwork, MemoryRegistry, MemoryStore};
pub use traits::{ClaimOutcome, MediaStore, NameRegistry, ObjectStore};
