use std::fmt;

use serde_json::Value;

use crate::BusError;

/// Сколько раз колбэк может сработать.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionBudget {
    /// Без ограничений.
    Any,
    /// Не больше `n` раз, `n >= 1`.
    Limited(u64),
}

impl ExecutionBudget {
    pub const ONCE: Self = Self::Limited(1);

    /// `0` трактуется как «без ограничений».
    pub fn from_count(n: u64) -> Self {
        match n {
            0 => Self::Any,
            n => Self::Limited(n),
        }
    }

    /// Исчерпан ли бюджет после `executions` срабатываний.
    pub fn is_exhausted_after(
        self,
        executions: u64,
    ) -> bool {
        match self {
            Self::Any => false,
            Self::Limited(n) => executions >= n,
        }
    }

    pub fn limit(self) -> Option<u64> {
        match self {
            Self::Any => None,
            Self::Limited(n) => Some(n),
        }
    }
}

impl fmt::Display for ExecutionBudget {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Limited(n) => write!(f, "{n}"),
        }
    }
}

fn rejected(got: impl fmt::Display) -> BusError {
    BusError::invalid_argument(format!(
        "only a non-negative integer or \"any\" is accepted as the number of executions, got {got}"
    ))
}

/// Всё, из чего можно получить бюджет выполнений: целые числа, строка
/// `"any"` (без учёта регистра), JSON-значение или сам бюджет.
pub trait IntoBudget {
    fn into_budget(self) -> Result<ExecutionBudget, BusError>;
}

impl IntoBudget for ExecutionBudget {
    fn into_budget(self) -> Result<ExecutionBudget, BusError> {
        Ok(self)
    }
}

impl IntoBudget for &str {
    fn into_budget(self) -> Result<ExecutionBudget, BusError> {
        if self.eq_ignore_ascii_case("any") {
            Ok(ExecutionBudget::Any)
        } else {
            Err(rejected(format_args!("{self:?}")))
        }
    }
}

impl IntoBudget for String {
    fn into_budget(self) -> Result<ExecutionBudget, BusError> {
        self.as_str().into_budget()
    }
}

impl IntoBudget for &String {
    fn into_budget(self) -> Result<ExecutionBudget, BusError> {
        self.as_str().into_budget()
    }
}

macro_rules! unsigned_budget {
    ($($t:ty),*) => {$(
        impl IntoBudget for $t {
            fn into_budget(self) -> Result<ExecutionBudget, BusError> {
                Ok(ExecutionBudget::from_count(self as u64))
            }
        }
    )*};
}

macro_rules! signed_budget {
    ($($t:ty),*) => {$(
        impl IntoBudget for $t {
            fn into_budget(self) -> Result<ExecutionBudget, BusError> {
                u64::try_from(self)
                    .map(ExecutionBudget::from_count)
                    .map_err(|_| rejected(self))
            }
        }
    )*};
}

unsigned_budget!(u8, u16, u32, u64, usize);
signed_budget!(i8, i16, i32, i64, isize);

impl IntoBudget for &Value {
    fn into_budget(self) -> Result<ExecutionBudget, BusError> {
        match self {
            Value::String(s) => s.as_str().into_budget(),
            Value::Number(n) => n
                .as_u64()
                .map(ExecutionBudget::from_count)
                .ok_or_else(|| rejected(n)),
            other => Err(rejected(other)),
        }
    }
}

impl IntoBudget for Value {
    fn into_budget(self) -> Result<ExecutionBudget, BusError> {
        (&self).into_budget()
    }
}
