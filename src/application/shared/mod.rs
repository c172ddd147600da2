pub mod invalidation;
pub mod read_through;

pub use invalidation::{Mutation, invalidate_after, keys_affected_by};
pub use read_through::read_through;
