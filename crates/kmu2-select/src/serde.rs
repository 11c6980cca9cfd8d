use kmu2_core::errors::{ErrorInfo, Kmu2Error};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

pub(crate) fn serde_error(code: &str, err: impl ToString) -> Kmu2Error {
    Kmu2Error::Serde(ErrorInfo::new(
        format!("kmu2_select.{code}"),
        err.to_string(),
    ))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sort_keys(value)))
                    .collect::<Map<_, _>>(),
            )
        }
        Value::Array(values) => Value::Array(values.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// JSON tree of `value` with every object's keys in sorted order.
pub fn to_canonical_value<T: Serialize>(value: &T) -> Result<Value, Kmu2Error> {
    let value = serde_json::to_value(value).map_err(|err| serde_error("json_serialize", err))?;
    Ok(sort_keys(value))
}

/// Serializes a configuration into YAML.
pub fn to_yaml_string<T: Serialize>(value: &T) -> Result<String, Kmu2Error> {
    serde_yaml::to_string(value).map_err(|err| serde_error("yaml_serialize", err))
}

/// Deserializes a YAML configuration payload.
pub fn from_yaml_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, Kmu2Error> {
    serde_yaml::from_slice(data).map_err(|err| serde_error("yaml_deserialize", err))
}
