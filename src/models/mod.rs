pub mod bet;
pub mod event;
pub mod matched;
pub mod option;
pub mod queue;
pub mod transaction;

pub use bet::*;
pub use event::*;
pub use matched::*;
pub use option::*;
pub use queue::*;
pub use transaction::*;
