use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::CodecError;

/// Вид конверта (поле `type` на проводе).
///
/// Неизвестные значения `type` разбираются как [`MessageKind::Implicit`]:
/// такой конверт всё равно может быть доставлен локально по `eventName`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MessageKind {
    Subscribe,
    Unsubscribe,
    Publish,
    SendToAgent,
    #[default]
    Implicit,
}

impl MessageKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
            Self::Publish => "publish",
            Self::SendToAgent => "send-to-agent",
            Self::Implicit => "",
        }
    }

    pub fn from_wire(s: &str) -> Self {
        match s {
            "subscribe" => Self::Subscribe,
            "unsubscribe" => Self::Unsubscribe,
            "publish" => Self::Publish,
            "send-to-agent" => Self::SendToAgent,
            _ => Self::Implicit,
        }
    }

    /// Несёт ли конверт полезную нагрузку для подписчиков.
    pub fn is_delivery(self) -> bool {
        matches!(self, Self::Publish | Self::Implicit)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Implicit => f.write_str("implicit"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Конверт протокола: `{ type, eventName, payload }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub kind: MessageKind,
    pub event_name: Option<String>,
    pub payload: Value,
}

#[derive(Serialize)]
struct WireEnvelope<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(rename = "eventName", skip_serializing_if = "Option::is_none")]
    event_name: Option<&'a str>,
    payload: &'a Value,
}

impl Envelope {
    pub fn new(
        kind: MessageKind,
        event_name: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            kind,
            event_name: Some(event_name.into()),
            payload,
        }
    }

    pub fn subscribe(event_name: impl Into<String>) -> Self {
        Self::new(MessageKind::Subscribe, event_name, Value::Null)
    }

    pub fn unsubscribe(event_name: impl Into<String>) -> Self {
        Self::new(MessageKind::Unsubscribe, event_name, Value::Null)
    }

    pub fn publish(
        event_name: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self::new(MessageKind::Publish, event_name, payload)
    }

    pub fn send_to_agent(
        event_name: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self::new(MessageKind::SendToAgent, event_name, payload)
    }

    /// Конверт без вида: так Agent пересылает публикации подписчикам и так
    /// фрейм обращается к локальным слушателям Agent-а.
    pub fn implicit(
        event_name: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self::new(MessageKind::Implicit, event_name, payload)
    }

    pub fn event_name(&self) -> Option<&str> {
        self.event_name.as_deref()
    }

    /// Представление для транспорта, передающего структурированные данные.
    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(3);
        map.insert("type".into(), Value::String(self.kind.as_str().into()));
        if let Some(name) = &self.event_name {
            map.insert("eventName".into(), Value::String(name.clone()));
        }
        map.insert("payload".into(), self.payload.clone());
        Value::Object(map)
    }

    /// JSON-байты для транспорта, передающего байты.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let wire = WireEnvelope {
            kind: self.kind.as_str(),
            event_name: self.event_name.as_deref(),
            payload: &self.payload,
        };
        serde_json::to_vec(&wire).map_err(|e| CodecError::Encode {
            reason: e.to_string(),
        })
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CodecError> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| CodecError::Malformed {
            reason: e.to_string(),
        })?;
        Self::from_value(&value)
    }

    /// Разбирает входящие данные.
    ///
    /// - не объект: [`CodecError::NotAnObject`];
    /// - `type` отсутствует, пустой, неизвестный или не строка: `Implicit`;
    /// - `eventName` отсутствует или `null`: `None`, не строка: ошибка;
    /// - `payload` отсутствует: `null`;
    /// - прочие поля игнорируются.
    pub fn from_value(data: &Value) -> Result<Self, CodecError> {
        let obj = data.as_object().ok_or(CodecError::NotAnObject)?;

        let kind = obj
            .get("type")
            .and_then(Value::as_str)
            .map(MessageKind::from_wire)
            .unwrap_or_default();

        let event_name = match obj.get("eventName") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name.clone()),
            Some(_) => {
                return Err(CodecError::InvalidField {
                    field: "eventName",
                    expected: "string",
                })
            }
        };

        let payload = obj.get("payload").cloned().unwrap_or(Value::Null);

        Ok(Self {
            kind,
            event_name,
            payload,
        })
    }
}
