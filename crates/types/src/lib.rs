pub mod address;
pub mod content;
pub mod ids;

pub use address::*;
pub use content::*;
pub use ids::*;
