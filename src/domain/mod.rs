pub mod event;
pub mod order;
pub mod product;
pub mod session;
pub mod settings;

pub use event::*;
pub use order::*;
pub use product::*;
pub use session::*;
pub use settings::*;
