use itertools::Itertools;
use std::{collections::BTreeMap, collections::HashMap, fmt, time::Duration};
use zbus::zvariant;

pub type Result<T> = std::result::Result<T, ConversionError>;

#[derive(Debug, thiserror::Error)]
#[error("Failed to turn `{value}` into a value of type {target_type}")]
pub struct ConversionError {
    pub value: Value,
    pub target_type: &'static str,
    pub source: Option<Box<dyn std::error::Error + Sync + Send + 'static>>,
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to parse duration. Must be a number, or a string like \"150ms\"")]
pub struct DurationParseError;

impl ConversionError {
    pub fn new(value: Value, target_type: &'static str, source: impl std::error::Error + 'static + Sync + Send) -> Self {
        ConversionError { value, target_type, source: Some(Box::new(source)) }
    }

    fn plain(value: &Value, target_type: &'static str) -> Self {
        ConversionError { value: value.clone(), target_type, source: None }
    }
}

/// A dynamically typed value, as carried by bus message bodies and config entries.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Uint(u64),
    Str(String),
    Bool(bool),
    Float(f64),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(x) => write!(f, "{}", x),
            Value::Uint(x) => write!(f, "{}", x),
            Value::Str(x) => write!(f, "{}", x),
            Value::Bool(x) => write!(f, "{}", x),
            Value::Float(x) => write!(f, "{}", x),
            Value::List(items) => write!(f, "{}", items.iter().join(";")),
            Value::Map(map) => write!(f, "{{{}}}", map.iter().map(|(k, v)| format!("{}: {}", k, v)).join(", ")),
        }
    }
}

macro_rules! impl_value_from {
    ($($t:ty => $variant:ident as $target:ty),* $(,)?) => {
        $(impl From<$t> for Value {
            fn from(x: $t) -> Self { Value::$variant(x as $target) }
        })*
    };
}

impl_value_from!(i32 => Int as i64, i64 => Int as i64, u32 => Uint as u64, u64 => Uint as u64, f64 => Float as f64);

impl From<bool> for Value {
    fn from(x: bool) -> Self {
        Value::Bool(x)
    }
}

impl From<&str> for Value {
    fn from(x: &str) -> Self {
        Value::Str(x.to_string())
    }
}

impl From<String> for Value {
    fn from(x: String) -> Self {
        Value::Str(x)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

pub trait FromValue: Sized {
    fn from_value(x: &Value) -> Result<Self>;
}

macro_rules! impl_from_value {
    ($($t:ty => $method:ident),* $(,)?) => {
        $(impl FromValue for $t {
            fn from_value(x: &Value) -> Result<Self> { x.$method() }
        })*
    };
}

impl_from_value!(
    i32 => as_i32,
    i64 => as_i64,
    u32 => as_u32,
    u64 => as_u64,
    f64 => as_f64,
    bool => as_bool,
    String => as_string,
    Duration => as_duration,
    Vec<String> => as_string_vec,
);

impl FromValue for Value {
    fn from_value(x: &Value) -> Result<Self> {
        Ok(x.clone())
    }
}

impl Value {
    pub fn read_as<T: FromValue>(&self) -> Result<T> {
        T::from_value(self)
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Value::Int(x) => Ok(*x),
            Value::Uint(x) => i64::try_from(*x).map_err(|e| ConversionError::new(self.clone(), "i64", e)),
            Value::Bool(x) => Ok(*x as i64),
            Value::Str(s) => s.trim().parse().map_err(|e| ConversionError::new(self.clone(), "i64", e)),
            _ => Err(ConversionError::plain(self, "i64")),
        }
    }

    pub fn as_i32(&self) -> Result<i32> {
        let x = self.as_i64()?;
        i32::try_from(x).map_err(|e| ConversionError::new(self.clone(), "i32", e))
    }

    pub fn as_u64(&self) -> Result<u64> {
        match self {
            Value::Uint(x) => Ok(*x),
            Value::Int(x) => u64::try_from(*x).map_err(|e| ConversionError::new(self.clone(), "u64", e)),
            Value::Str(s) => s.trim().parse().map_err(|e| ConversionError::new(self.clone(), "u64", e)),
            _ => Err(ConversionError::plain(self, "u64")),
        }
    }

    pub fn as_u32(&self) -> Result<u32> {
        let x = self.as_u64()?;
        u32::try_from(x).map_err(|e| ConversionError::new(self.clone(), "u32", e))
    }

    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Value::Float(x) => Ok(*x),
            Value::Int(x) => Ok(*x as f64),
            Value::Uint(x) => Ok(*x as f64),
            Value::Str(s) => s.trim().parse().map_err(|e| ConversionError::new(self.clone(), "f64", e)),
            _ => Err(ConversionError::plain(self, "f64")),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(x) => Ok(*x),
            Value::Int(x) => Ok(*x != 0),
            Value::Uint(x) => Ok(*x != 0),
            Value::Str(s) => s.trim().to_lowercase().parse().map_err(|e| ConversionError::new(self.clone(), "bool", e)),
            _ => Err(ConversionError::plain(self, "bool")),
        }
    }

    /// Borrow the content of a string value. Other variants are not converted.
    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::Str(s) => Ok(s),
            _ => Err(ConversionError::plain(self, "string")),
        }
    }

    /// Render any scalar as a string. Lists and maps are refused.
    pub fn as_string(&self) -> Result<String> {
        match self {
            Value::List(_) | Value::Map(_) => Err(ConversionError::plain(self, "string")),
            other => Ok(other.to_string()),
        }
    }

    /// Lists are returned as is, strings are split on `;` with a trailing separator ignored.
    pub fn as_vec(&self) -> Result<Vec<Value>> {
        match self {
            Value::List(items) => Ok(items.clone()),
            Value::Str(s) => Ok(split_list(s).into_iter().map(Value::Str).collect()),
            _ => Err(ConversionError::plain(self, "vec")),
        }
    }

    pub fn as_string_vec(&self) -> Result<Vec<String>> {
        self.as_vec()?.iter().map(Value::as_string).collect()
    }

    pub fn as_map(&self) -> Result<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Ok(map),
            _ => Err(ConversionError::plain(self, "map")),
        }
    }

    /// Numbers are read as milliseconds. Strings may carry a unit: `100ms`, `1.5s`, `5m`/`5min`, `1h`.
    pub fn as_duration(&self) -> Result<Duration> {
        match self {
            Value::Int(_) | Value::Uint(_) => Ok(Duration::from_millis(self.as_u64()?)),
            Value::Str(s) => parse_duration(s.trim()).ok_or_else(|| ConversionError::new(self.clone(), "duration", DurationParseError)),
            _ => Err(ConversionError::plain(self, "duration")),
        }
    }

    /// Read a delay where a bare number counts in `spec.unit`, clamped to at least `spec.min`.
    pub fn as_delay(&self, spec: DelaySpec) -> Result<Duration> {
        let delay = match self.as_f64() {
            Ok(count) if count >= 0.0 => spec.unit.mul_f64(count),
            Ok(_) => Duration::ZERO,
            Err(_) => self.as_duration()?,
        };
        Ok(delay.max(spec.min))
    }
}

/// How a bare number is interpreted by [`Value::as_delay`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelaySpec {
    pub unit: Duration,
    pub min: Duration,
}

impl DelaySpec {
    pub const SECONDS: DelaySpec = DelaySpec { unit: Duration::from_secs(1), min: Duration::ZERO };
    pub const MINUTES: DelaySpec = DelaySpec { unit: Duration::from_secs(60), min: Duration::ZERO };

    pub fn with_min(self, min: Duration) -> Self {
        DelaySpec { min, ..self }
    }
}

fn split_list(s: &str) -> Vec<String> {
    let s = s.strip_suffix(';').unwrap_or(s);
    if s.is_empty() {
        return Vec::new();
    }
    s.split(';').map(|x| x.to_string()).collect()
}

fn parse_duration(s: &str) -> Option<Duration> {
    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix("min").or_else(|| s.strip_suffix('m')) {
        secs.parse::<f64>().ok().map(|m| Duration::from_secs(f64::floor(m * 60f64) as u64))
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<f64>().ok().map(|s| Duration::from_millis(f64::floor(s * 1000f64) as u64))
    } else if let Some(hours) = s.strip_suffix('h') {
        hours.parse::<f64>().ok().map(|h| Duration::from_secs(f64::floor(h * 3600f64) as u64))
    } else {
        s.parse().ok().map(Duration::from_millis)
    }
}

impl TryFrom<Value> for zvariant::Value<'static> {
    type Error = ConversionError;

    /// Integers are sent as 32 bit, which is what every dock method takes.
    /// Homogeneous lists become typed arrays, anything else an array of variants.
    fn try_from(value: Value) -> Result<Self> {
        Ok(match &value {
            Value::Int(_) => zvariant::Value::from(value.as_i32()?),
            Value::Uint(_) => zvariant::Value::from(value.as_u32()?),
            Value::Str(s) => zvariant::Value::from(s.clone()),
            Value::Bool(b) => zvariant::Value::from(*b),
            Value::Float(x) => zvariant::Value::from(*x),
            Value::Map(_) => zvariant::Value::from(to_variant_map(value)?),
            Value::List(items) => {
                if items.iter().all(|x| matches!(x, Value::Str(_))) {
                    zvariant::Value::from(items.iter().map(|x| x.to_string()).collect::<Vec<_>>())
                } else if items.iter().all(|x| matches!(x, Value::Float(_))) {
                    zvariant::Value::from(items.iter().map(Value::as_f64).collect::<Result<Vec<_>>>()?)
                } else if items.iter().all(|x| matches!(x, Value::Int(_))) {
                    zvariant::Value::from(items.iter().map(Value::as_i32).collect::<Result<Vec<_>>>()?)
                } else if items.iter().all(|x| matches!(x, Value::Map(_))) {
                    zvariant::Value::from(items.iter().cloned().map(to_variant_map).collect::<Result<Vec<_>>>()?)
                } else {
                    let variants = items.iter().cloned().map(zvariant::Value::try_from).collect::<Result<Vec<_>>>()?;
                    zvariant::Value::from(variants)
                }
            }
        })
    }
}

fn to_variant_map(value: Value) -> Result<HashMap<String, zvariant::Value<'static>>> {
    match value {
        Value::Map(map) => map.into_iter().map(|(k, v)| Ok((k, zvariant::Value::try_from(v)?))).collect(),
        other => Err(ConversionError::plain(&other, "map")),
    }
}

impl From<&zvariant::Value<'_>> for Value {
    fn from(value: &zvariant::Value<'_>) -> Self {
        use zvariant::Value as Z;
        match value {
            Z::U8(x) => Value::Uint(*x as u64),
            Z::U16(x) => Value::Uint(*x as u64),
            Z::U32(x) => Value::Uint(*x as u64),
            Z::U64(x) => Value::Uint(*x),
            Z::I16(x) => Value::Int(*x as i64),
            Z::I32(x) => Value::Int(*x as i64),
            Z::I64(x) => Value::Int(*x),
            Z::Bool(x) => Value::Bool(*x),
            Z::F64(x) => Value::Float(*x),
            Z::Str(x) => Value::Str(x.as_str().to_string()),
            Z::ObjectPath(x) => Value::Str(x.as_str().to_string()),
            Z::Signature(x) => Value::Str(x.as_str().to_string()),
            Z::Value(inner) => Value::from(&**inner),
            Z::Array(array) => Value::List(array.get().iter().map(Value::from).collect()),
            Z::Structure(structure) => Value::List(structure.fields().iter().map(Value::from).collect()),
            Z::Dict(dict) => match HashMap::<String, zvariant::Value>::try_from(dict.clone()) {
                Ok(map) => Value::Map(map.iter().map(|(k, v)| (k.clone(), Value::from(v))).collect()),
                Err(err) => {
                    log::warn!("Could not read dictionary with non-string keys: {:?}", err);
                    Value::Map(BTreeMap::new())
                }
            },
            #[allow(unreachable_patterns)]
            other => Value::Str(format!("{:?}", other)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_duration() {
        insta::assert_debug_snapshot!(Value::from("100ms").as_duration(), @r###"
        Ok(
            100ms,
        )
        "###);
        insta::assert_debug_snapshot!(Value::from("0.5s").as_duration(), @r###"
        Ok(
            500ms,
        )
        "###);
        insta::assert_debug_snapshot!(Value::from("5m").as_duration(), @r###"
        Ok(
            300s,
        )
        "###);
        insta::assert_debug_snapshot!(Value::from("2min").as_duration(), @r###"
        Ok(
            120s,
        )
        "###);
        insta::assert_debug_snapshot!(Value::from("1h").as_duration(), @r###"
        Ok(
            3600s,
        )
        "###);
        insta::assert_debug_snapshot!(Value::Int(250).as_duration(), @r###"
        Ok(
            250ms,
        )
        "###);
        assert!(Value::from("soon").as_duration().is_err());
    }

    #[test]
    fn test_as_delay() {
        let spec = DelaySpec::SECONDS.with_min(Duration::from_secs(5));
        assert_eq!(Value::from("30").as_delay(spec).unwrap(), Duration::from_secs(30));
        assert_eq!(Value::from("2").as_delay(spec).unwrap(), Duration::from_secs(5));
        assert_eq!(Value::from("2m").as_delay(spec).unwrap(), Duration::from_secs(120));
        assert_eq!(Value::Int(3).as_delay(DelaySpec::MINUTES).unwrap(), Duration::from_secs(180));
    }

    #[test]
    fn test_list_splitting() {
        assert_eq!(Value::from("a;b;c;").as_string_vec().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(Value::from("").as_string_vec().unwrap(), Vec::<String>::new());
        assert_eq!(Value::from(vec!["x", "y"]).as_string_vec().unwrap(), vec!["x", "y"]);
    }

    #[test]
    fn test_scalar_conversions() {
        assert_eq!(Value::from("42").as_i32().unwrap(), 42);
        assert_eq!(Value::Uint(7).as_i64().unwrap(), 7);
        assert_eq!(Value::from("True").as_bool().unwrap(), true);
        assert_eq!(Value::Int(0).as_bool().unwrap(), false);
        assert_eq!(Value::Int(3).as_f64().unwrap(), 3.0);
        assert!(Value::Int(i64::MAX).as_i32().is_err());
        assert!(Value::List(vec![]).as_string().is_err());
    }

    #[test]
    fn test_outgoing_variants() {
        let list = zvariant::Value::try_from(Value::from(vec![0.5, 1.0])).unwrap();
        assert_eq!(list.value_signature().as_str(), "ad");

        let strings = zvariant::Value::try_from(Value::List(vec![])).unwrap();
        assert_eq!(strings.value_signature().as_str(), "as");

        let map = Value::Map(maplit::btreemap! { "label".to_string() => Value::from("x"), "type".to_string() => Value::Int(0) });
        let items = zvariant::Value::try_from(Value::List(vec![map.clone(), map])).unwrap();
        assert_eq!(items.value_signature().as_str(), "aa{sv}");

        assert!(zvariant::Value::try_from(Value::Int(1 << 40)).is_err());
    }

    #[test]
    fn test_incoming_variants() {
        let nested = zvariant::Value::Value(Box::new(zvariant::Value::from(3i32)));
        assert_eq!(Value::from(&nested), Value::Int(3));
        assert_eq!(Value::from(&zvariant::Value::from(9u32)), Value::Uint(9));
        assert_eq!(
            Value::from(&zvariant::Value::from(vec!["a", "b"])),
            Value::List(vec![Value::from("a"), Value::from("b")])
        );
    }
}
