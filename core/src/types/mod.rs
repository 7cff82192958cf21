pub mod manager;
mod types;


pub use manager::TypeManager;
pub use types::{Prim, Type};
