use serde_json::Value;

use crate::BusError;

/// Упорядоченный непустой список имён событий для одной регистрации.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventNames(Vec<String>);

impl EventNames {
    pub fn single(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl<'a> IntoIterator for &'a EventNames {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Одно имя или список имён. Весь список проверяется до того, как что-либо
/// будет зарегистрировано.
pub trait IntoEventNames {
    fn into_event_names(self) -> Result<EventNames, BusError>;
}

impl IntoEventNames for EventNames {
    fn into_event_names(self) -> Result<EventNames, BusError> {
        Ok(self)
    }
}

impl IntoEventNames for &str {
    fn into_event_names(self) -> Result<EventNames, BusError> {
        Ok(EventNames::single(self))
    }
}

impl IntoEventNames for String {
    fn into_event_names(self) -> Result<EventNames, BusError> {
        Ok(EventNames::single(self))
    }
}

impl IntoEventNames for &String {
    fn into_event_names(self) -> Result<EventNames, BusError> {
        Ok(EventNames::single(self.clone()))
    }
}

impl IntoEventNames for Vec<String> {
    fn into_event_names(self) -> Result<EventNames, BusError> {
        Ok(EventNames(self))
    }
}

impl IntoEventNames for Vec<&str> {
    fn into_event_names(self) -> Result<EventNames, BusError> {
        Ok(EventNames(self.into_iter().map(str::to_owned).collect()))
    }
}

impl IntoEventNames for &[&str] {
    fn into_event_names(self) -> Result<EventNames, BusError> {
        Ok(EventNames(self.iter().map(|s| (*s).to_owned()).collect()))
    }
}

impl<const N: usize> IntoEventNames for [&str; N] {
    fn into_event_names(self) -> Result<EventNames, BusError> {
        Ok(EventNames(self.iter().map(|s| (*s).to_owned()).collect()))
    }
}

/// Данные, пришедшие извне (например, из конфигурации или от другого
/// фрейма): строка или массив строк.
impl IntoEventNames for &Value {
    fn into_event_names(self) -> Result<EventNames, BusError> {
        match self {
            Value::String(name) => Ok(EventNames::single(name.clone())),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::String(name) => Ok(name.clone()),
                    other => Err(BusError::invalid_argument(format!(
                        "event name at index {i} must be a string, got {other}"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(EventNames),
            other => Err(BusError::invalid_argument(format!(
                "event name must be a string or a list of strings, got {other}"
            ))),
        }
    }
}

impl IntoEventNames for Value {
    fn into_event_names(self) -> Result<EventNames, BusError> {
        (&self).into_event_names()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_native_forms() {
        assert_eq!("a".into_event_names().unwrap().into_vec(), vec!["a"]);
        assert_eq!(
            ["a", "b"].into_event_names().unwrap().into_vec(),
            vec!["a", "b"]
        );
        assert_eq!(
            vec!["x".to_string()].into_event_names().unwrap().len(),
            1
        );
    }

    #[test]
    fn test_json_list_keeps_order() {
        let names = json!(["b", "a", "b"]).into_event_names().unwrap();
        assert_eq!(names.into_vec(), vec!["b", "a", "b"]);
    }

    /// Тест проверяет, что один нестроковый элемент бракует весь список.
    #[test]
    fn test_json_non_string_rejected() {
        let err = json!(["a", 7, "c"]).into_event_names().unwrap_err();
        match err {
            BusError::InvalidArgument { reason } => assert!(reason.contains("index 1")),
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(json!(42).into_event_names().is_err());
        assert!(json!(null).into_event_names().is_err());
        assert!(json!({"name": "a"}).into_event_names().is_err());
    }
}
