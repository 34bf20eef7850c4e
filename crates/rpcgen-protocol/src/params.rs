//! Parameter decoding for generated dispatch arms.
//!
//! A generated method arm builds a [`ParamSet`] from the request params and
//! its static parameter-name table, then pulls each argument out by
//! declaration index. Positional arrays are matched by index, named objects
//! by parameter name; both shapes go through the same calls, which is what
//! keeps server decoding and client encoding in agreement.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::registry::InvokeError;
use crate::request::RequestParams;

pub struct ParamSet<'a> {
    /// Declared parameter names, in declaration order. Comes from the
    /// generated code and always matches the indices used against it.
    names: &'static [&'static str],
    params: Option<&'a RequestParams>,
}

impl<'a> ParamSet<'a> {
    pub fn new(
        names: &'static [&'static str],
        params: Option<&'a RequestParams>,
    ) -> Result<Self, InvokeError> {
        if let Some(RequestParams::Array(values)) = params
            && values.len() > names.len()
        {
            return Err(InvokeError::InvalidParams(format!(
                "expected at most {} parameters, got {}",
                names.len(),
                values.len()
            )));
        }
        Ok(Self { names, params })
    }

    fn lookup(&self, index: usize) -> Option<&Value> {
        match self.params {
            None => None,
            Some(RequestParams::Array(values)) => values.get(index),
            Some(RequestParams::Object(map)) => map.get(self.names[index]),
        }
    }

    /// Decode a required parameter. Missing or mistyped values reject the
    /// request with Invalid Params before any method body runs.
    pub fn required<T: DeserializeOwned>(&self, index: usize) -> Result<T, InvokeError> {
        let name = self.names[index];
        let value = self.lookup(index).ok_or_else(|| {
            InvokeError::InvalidParams(format!("missing required parameter '{name}'"))
        })?;
        serde_json::from_value(value.clone())
            .map_err(|err| InvokeError::InvalidParams(format!("parameter '{name}': {err}")))
    }

    /// Decode an optional parameter, substituting the declared default when
    /// the caller omitted it. A present-but-mistyped value is still Invalid
    /// Params; omission is the only path to the default.
    pub fn optional<T: DeserializeOwned>(
        &self,
        index: usize,
        default: Value,
    ) -> Result<T, InvokeError> {
        let name = self.names[index];
        let value = match self.lookup(index) {
            Some(v) => v.clone(),
            None => default,
        };
        serde_json::from_value(value)
            .map_err(|err| InvokeError::InvalidParams(format!("parameter '{name}': {err}")))
    }
}
