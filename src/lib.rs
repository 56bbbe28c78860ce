/// Agent: broker in the hosting page, forwards publishes to subscribed frames.
pub mod agent;
/// Bus: per-frame subscribe/publish facade with execution budgets.
pub mod bus;
/// Settings loading.
pub mod config;
/// Same-context callback delivery with panic isolation.
pub mod local;
/// Flexible logging (formatting, filters, sinks).
pub mod logging;
/// Wire envelope and message kinds.
pub mod protocol;
/// Subscription and callback registries.
pub mod registry;
/// Transport traits and the in-process event loop.
pub mod transport;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Agent API.
pub use agent::{Agent, AgentAction, AgentConfig, AgentStats};
/// Bus API.
pub use bus::{Bus, BusConfig, BusStats};
/// config
pub use crate::config::Settings;
/// Error types shared with the `framebus-error` crate.
pub use framebus_error::{BusError, CodecError, ErrorExt, FrameBusResult, StackError, StatusCode};
/// Local delivery.
pub use local::{DeliveryReport, LocalCallback};
/// Envelope codec.
pub use protocol::{Envelope, MessageKind};
/// Registries and registration arguments.
pub use registry::{
    Callback, CallbackRecord, EventNames, ExecutionBudget, IntoBudget, IntoEventNames,
    SubscriptionRecord,
};
/// Transport.
pub use transport::{
    Endpoint, EndpointId, EndpointRef, EventLoop, ListenerId, MessageEvent, MessageHost, Window,
    WILDCARD_ORIGIN,
};
