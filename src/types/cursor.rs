use serde::{Deserialize, Serialize};

/// Opaque polling position derived from emitted events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeCursor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since_created_at_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since_message_id: Option<String>,
}

impl RealtimeCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_created_at_ms(mut self, created_at_ms: i64) -> Self {
        self.since_created_at_ms = Some(created_at_ms);
        self
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.since_message_id = Some(message_id.into());
        self
    }
}

/// Ordered query parameters appended to an endpoint URL.
///
/// Keys may repeat; absent values are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.pairs.push((key.into(), value.to_string()));
        self
    }

    /// Appends `value` only when present
    pub fn append_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.append(key, value),
            None => self,
        }
    }

    /// Repeats `key` once per value
    pub fn append_all<I, V>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        let key = key.into();
        for value in values {
            self.pairs.push((key.clone(), value.to_string()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
