pub mod config_manager;
pub mod error;
pub mod naming;
pub mod traits;
pub mod types;

pub use config_manager::*;
pub use error::*;
pub use naming::*;
pub use traits::*;
pub use types::*;
