#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde_json::{json, Value};

use framebus::{Agent, Bus, EventLoop, MessageEvent, MessageHost, MessageKind, Window};

#[derive(Debug, Arbitrary)]
enum FuzzKind {
    Subscribe,
    Unsubscribe,
    Publish,
    SendToAgent,
    Empty,
    Other(String),
    NotAString(i64),
}

#[derive(Debug, Arbitrary)]
struct FuzzMessage {
    kind: FuzzKind,
    event_name: Option<String>,
    with_source: bool,
    payload: i64,
}

impl FuzzMessage {
    fn to_value(&self) -> Value {
        let kind = match &self.kind {
            FuzzKind::Subscribe => json!(MessageKind::Subscribe.as_str()),
            FuzzKind::Unsubscribe => json!(MessageKind::Unsubscribe.as_str()),
            FuzzKind::Publish => json!(MessageKind::Publish.as_str()),
            FuzzKind::SendToAgent => json!(MessageKind::SendToAgent.as_str()),
            FuzzKind::Empty => json!(MessageKind::Implicit.as_str()),
            FuzzKind::Other(s) => json!(s),
            FuzzKind::NotAString(n) => json!(n),
        };
        json!({
            "type": kind,
            "eventName": self.event_name,
            "payload": self.payload,
        })
    }
}

fuzz_target!(|messages: Vec<FuzzMessage>| {
    let el = EventLoop::new();
    let page = Window::new(&el, "https://host.fuzz");
    let Ok(agent) = Agent::new(page.clone()) else {
        return;
    };
    let frame = page.create_frame("https://frame.fuzz");
    let Ok(_bus) = Bus::new(frame.clone()) else {
        return;
    };

    // Любая последовательность сообщений обрабатывается без паники, а
    // очередь всегда доходит до конца.
    for message in messages.iter().take(64) {
        let source = message.with_source.then(|| frame.endpoint());
        let event = MessageEvent::new(message.to_value(), frame.origin(), source);
        agent.dispatch(&event);
        el.run_bounded(256);
    }
    el.run_until_idle();

    for name in agent.event_names() {
        assert!(agent.listener_count(&name) > 0);
    }

    // Подписка с источником и непустым именем, после которой не было
    // отписки, обязана оставить запись у Agent-а.
    for (i, message) in messages.iter().take(64).enumerate() {
        let Some(name) = message.event_name.as_deref().filter(|n| !n.is_empty()) else {
            continue;
        };
        if !matches!(message.kind, FuzzKind::Subscribe) || !message.with_source {
            continue;
        }
        let unsubscribed_later = messages.iter().take(64).skip(i + 1).any(|m| {
            matches!(m.kind, FuzzKind::Unsubscribe)
                && m.with_source
                && m.event_name.as_deref() == Some(name)
        });
        if !unsubscribed_later {
            assert!(agent.listener_count(name) > 0, "subscribe to {name:?} was not registered");
        }
    }
});
