//! Operation request as delivered by the ordering collaborator
//!
//! Wire form (JSON):
//!
//! ```text
//! {"contract": "CarContract", "function": "CreateCar", "args": ["V1", ...],
//!  "transient": {"make": "<base64>"}, "identity": {"orgId": "...", "clientId": "..."},
//!  "txId": "...", "timestamp": "2024-01-01T00:00:00Z"}
//! ```
//!
//! `transient`, `txId` and `timestamp` are optional.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::Credential;

/// One operation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Invocation {
    pub contract: String,
    pub function: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Restricted inputs; never persisted except through a collection write
    #[serde(default, with = "transient_base64", skip_serializing_if = "BTreeMap::is_empty")]
    pub transient: BTreeMap<String, Vec<u8>>,
    pub identity: Credential,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Invocation {
    pub fn new(contract: impl Into<String>, function: impl Into<String>, identity: Credential) -> Self {
        Self {
            contract: contract.into(),
            function: function.into(),
            args: Vec::new(),
            transient: BTreeMap::new(),
            identity,
            tx_id: None,
            timestamp: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn transient(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.transient.insert(key.into(), value.into());
        self
    }

    pub fn with_tx_id(mut self, tx_id: impl Into<String>) -> Self {
        self.tx_id = Some(tx_id.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

mod transient_base64 {
    use std::collections::BTreeMap;

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(map: &BTreeMap<String, Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        map.iter()
            .map(|(k, v)| (k, STANDARD.encode(v)))
            .collect::<BTreeMap<_, _>>()
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<String, Vec<u8>>, D::Error> {
        BTreeMap::<String, String>::deserialize(d)?
            .into_iter()
            .map(|(k, v)| {
                STANDARD
                    .decode(v.as_bytes())
                    .map(|bytes| (k.clone(), bytes))
                    .map_err(|e| D::Error::custom(format!("transient value {} is not base64: {}", k, e)))
            })
            .collect()
    }
}
