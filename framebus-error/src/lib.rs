pub mod ext;
pub mod macros;
pub mod stack;
pub mod status_code;
pub mod types;

// Публичный экспорт, чтобы внешний код не ходил по вложенным модулям.
pub use ext::*;
pub use macros::*;
pub use stack::*;
pub use status_code::*;
pub use types::*;

pub type FrameBusResult<T> = Result<T, StackError>;
