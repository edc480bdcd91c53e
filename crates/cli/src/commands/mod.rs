pub mod maps;
pub mod session;
pub mod signatures;
pub mod states;
pub mod util;

pub use maps::*;
pub use session::*;
pub use signatures::*;
pub use states::*;
pub use util::*;
