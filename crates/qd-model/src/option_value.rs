use crate::HostPool;

/// Value carried through the generic option channel of a driver.
///
/// Which variant a key accepts is decided by the backend that owns the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Str(String),
    Int(i64),
    HostPool(HostPool),
}

/// Discriminant of [`OptionValue`], used by backends to declare the type a key expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    Str,
    Int,
    HostPool,
}

impl OptionValue {
    pub fn kind(&self) -> OptionKind {
        match self {
            OptionValue::Str(_) => OptionKind::Str,
            OptionValue::Int(_) => OptionKind::Int,
            OptionValue::HostPool(_) => OptionKind::HostPool,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_host_pool(&self) -> Option<&HostPool> {
        match self {
            OptionValue::HostPool(p) => Some(p),
            _ => None,
        }
    }
}

impl OptionKind {
    pub fn label(&self) -> &'static str {
        match self {
            OptionKind::Str => "string",
            OptionKind::Int => "int",
            OptionKind::HostPool => "host pool",
        }
    }
}

impl std::fmt::Display for OptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        OptionValue::Str(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Str(v.to_string())
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Int(v)
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        OptionValue::Int(v.into())
    }
}

impl From<HostPool> for OptionValue {
    fn from(v: HostPool) -> Self {
        OptionValue::HostPool(v)
    }
}
