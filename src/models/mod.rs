pub mod finding;
pub mod assessment;
pub mod reputation;
pub mod verdict;
pub mod identity;

pub use finding::*;
pub use assessment::*;
pub use reputation::*;
pub use verdict::*;
pub use identity::*;
