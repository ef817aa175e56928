pub mod claim;
pub mod code;
pub mod message;

pub use claim::*;
pub use code::*;
pub use message::*;
