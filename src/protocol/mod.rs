//! Кодек конвертов протокола.
//!
//! На проводе конверт: объект с тремя полями, имена которых не меняются:
//!
//! ```text
//! { type: "subscribe"|"unsubscribe"|"publish"|"send-to-agent"|"", eventName: string, payload: any }
//! ```
//!
//! Поля версии нет: совместимость держится на неизменных именах полей, а
//! получатель игнорирует всё лишнее.

pub mod envelope;

pub use envelope::{Envelope, MessageKind};
