//! Реестры подписок обеих ролей.
//!
//! [`SubscriptionRegistry`] хранит удалённых подписчиков Agent-а,
//! [`CallbackRegistry`] хранит колбэки Bus с бюджетом выполнений.

pub mod budget;
pub mod callbacks;
pub mod names;
pub mod subscriptions;

pub use budget::{ExecutionBudget, IntoBudget};
pub use callbacks::{Callback, CallbackRecord, CallbackRegistry, DueCallbacks};
pub use names::{EventNames, IntoEventNames};
pub use subscriptions::{SubscriptionRecord, SubscriptionRegistry};
