//! # Access Control Policy
//!
//! An immutable table of (asset kind, action) -> rule, plus a collection
//! membership table. Built once at startup and shared behind an `Arc`.
//!
//! - Org matching is exact and case-sensitive
//! - A pair absent from the table is denied
//! - A collection absent from the membership table admits nobody

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::credential::Credential;
use super::errors::{AccessError, AccessResult};
use crate::storage::is_valid_name;

/// Wildcard org entry meaning "any resolved credential"
pub const ANY_ORG: &str = "*";

/// Asset families the policy distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Vehicle,
    Order,
    Batch,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Vehicle => "vehicle",
            AssetKind::Order => "order",
            AssetKind::Batch => "batch",
        }
    }
}

/// Operations the policy distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Query,
    History,
    Delete,
    Register,
    #[serde(rename = "match")]
    Match,
    Transfer,
    WritePrivate,
    ReadPrivate,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Query => "query",
            Action::History => "history",
            Action::Delete => "delete",
            Action::Register => "register",
            Action::Match => "match",
            Action::Transfer => "transfer",
            Action::WritePrivate => "write_private",
            Action::ReadPrivate => "read_private",
        }
    }
}

/// Who may perform an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Any resolved credential
    Any,
    /// Members of these organizations
    Orgs(BTreeSet<String>),
}

impl Rule {
    pub fn orgs<I, S>(orgs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Rule::Orgs(orgs.into_iter().map(Into::into).collect())
    }

    pub fn admits(&self, org_id: &str) -> bool {
        match self {
            Rule::Any => true,
            Rule::Orgs(orgs) => orgs.contains(org_id),
        }
    }
}

/// Access gate seam used by every operation
pub trait AccessGate: Send + Sync {
    /// Pure decision for an (asset, action) pair
    fn authorize(&self, credential: &Credential, asset: AssetKind, action: Action) -> bool;

    /// Whether the caller's organization belongs to a restricted collection
    fn can_access_collection(&self, credential: &Credential, collection: &str) -> bool;

    /// Like [`AccessGate::authorize`] but yields a diagnostic denial.
    fn require(&self, credential: &Credential, asset: AssetKind, action: Action) -> AccessResult<()> {
        credential.require_resolved()?;
        if self.authorize(credential, asset, action) {
            Ok(())
        } else {
            Err(AccessError::Denied {
                org: credential.org_id.clone(),
                client: credential.client_id.clone(),
                asset: asset.as_str().to_string(),
                action: action.as_str().to_string(),
            })
        }
    }

    /// Like [`AccessGate::can_access_collection`] but yields a diagnostic denial.
    fn require_collection(&self, credential: &Credential, collection: &str) -> AccessResult<()> {
        credential.require_resolved()?;
        if self.can_access_collection(credential, collection) {
            Ok(())
        } else {
            Err(AccessError::CollectionDenied {
                org: credential.org_id.clone(),
                client: credential.client_id.clone(),
                collection: collection.to_string(),
            })
        }
    }
}

/// The policy table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    rules: HashMap<(AssetKind, Action), Rule>,
    collections: HashMap<String, BTreeSet<String>>,
}

impl AccessPolicy {
    /// A policy that denies everything
    pub fn deny_all() -> Self {
        Self {
            rules: HashMap::new(),
            collections: HashMap::new(),
        }
    }

    pub fn with_rule(mut self, asset: AssetKind, action: Action, rule: Rule) -> Self {
        self.rules.insert((asset, action), rule);
        self
    }

    pub fn with_collection<I, S>(mut self, collection: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collections
            .insert(collection.into(), members.into_iter().map(Into::into).collect());
        self
    }

    pub fn rule(&self, asset: AssetKind, action: Action) -> Option<&Rule> {
        self.rules.get(&(asset, action))
    }

    /// Builds a policy from its configuration form, validating every name.
    pub fn from_config(config: &PolicyConfig) -> AccessResult<Self> {
        let mut policy = Self::deny_all();

        for entry in &config.rules {
            if policy.rules.contains_key(&(entry.asset, entry.action)) {
                return Err(AccessError::InvalidPolicy(format!(
                    "duplicate rule for {} {}",
                    entry.asset.as_str(),
                    entry.action.as_str()
                )));
            }
            let rule = if entry.orgs.iter().any(|o| o == ANY_ORG) {
                if entry.orgs.len() > 1 {
                    return Err(AccessError::InvalidPolicy(format!(
                        "rule for {} {} mixes \"*\" with named orgs",
                        entry.asset.as_str(),
                        entry.action.as_str()
                    )));
                }
                Rule::Any
            } else {
                validate_names("org", &entry.orgs)?;
                Rule::orgs(entry.orgs.iter().cloned())
            };
            policy.rules.insert((entry.asset, entry.action), rule);
        }

        for (collection, members) in &config.collections {
            if !is_valid_name(collection) {
                return Err(AccessError::InvalidPolicy(format!(
                    "invalid collection name: {:?}",
                    collection
                )));
            }
            validate_names("org", members)?;
            policy
                .collections
                .insert(collection.clone(), members.iter().cloned().collect());
        }

        Ok(policy)
    }

    /// Configuration form of this policy, in deterministic order.
    pub fn to_config(&self) -> PolicyConfig {
        let mut keys: Vec<_> = self.rules.keys().copied().collect();
        keys.sort();

        let rules = keys
            .into_iter()
            .map(|(asset, action)| RuleConfig {
                asset,
                action,
                orgs: match &self.rules[&(asset, action)] {
                    Rule::Any => vec![ANY_ORG.to_string()],
                    Rule::Orgs(orgs) => orgs.iter().cloned().collect(),
                },
            })
            .collect();

        let collections = self
            .collections
            .iter()
            .map(|(name, members)| (name.clone(), members.iter().cloned().collect()))
            .collect();

        PolicyConfig { rules, collections }
    }
}

impl Default for AccessPolicy {
    /// The stock policy for the vehicle, order and batch contracts.
    fn default() -> Self {
        use Action::*;
        use AssetKind::*;

        let mut policy = Self::deny_all()
            .with_collection(crate::contracts::ORDER_COLLECTION, ["Factory", "Dealer"])
            .with_collection(crate::contracts::BATCH_PRIVATE_COLLECTION, ["Farmer", "Miller"]);

        let table: [(AssetKind, &[Action], Rule); 8] = [
            (Vehicle, &[Create, Delete], Rule::orgs(["Factory"])),
            (Vehicle, &[Register], Rule::orgs(["Registrar"])),
            (Vehicle, &[Read, Query, History, Match], Rule::Any),
            (Order, &[Create, Delete], Rule::orgs(["Dealer"])),
            (Order, &[Read, Query], Rule::Any),
            (Batch, &[Create, WritePrivate], Rule::orgs(["Farmer"])),
            (Batch, &[Transfer, Read, Query, History], Rule::Any),
            (Batch, &[ReadPrivate], Rule::Any),
        ];

        for (asset, actions, rule) in table {
            for action in actions {
                policy = policy.with_rule(asset, *action, rule.clone());
            }
        }
        policy
    }
}

impl AccessGate for AccessPolicy {
    fn authorize(&self, credential: &Credential, asset: AssetKind, action: Action) -> bool {
        credential.is_resolved()
            && self
                .rule(asset, action)
                .map(|rule| rule.admits(&credential.org_id))
                .unwrap_or(false)
    }

    fn can_access_collection(&self, credential: &Credential, collection: &str) -> bool {
        credential.is_resolved()
            && self
                .collections
                .get(collection)
                .map(|members| members.contains(&credential.org_id))
                .unwrap_or(false)
    }
}

fn validate_names(what: &str, names: &[String]) -> AccessResult<()> {
    if names.is_empty() {
        return Err(AccessError::InvalidPolicy(format!("empty {} list", what)));
    }
    match names.iter().find(|n| !is_valid_name(n)) {
        Some(bad) => Err(AccessError::InvalidPolicy(format!("invalid {} name: {:?}", what, bad))),
        None => Ok(()),
    }
}

/// One rule in configuration form. `"*"` in `orgs` means any caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    pub asset: AssetKind,
    pub action: Action,
    pub orgs: Vec<String>,
}

/// Serializable policy, as found in the config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    pub rules: Vec<RuleConfig>,
    #[serde(default)]
    pub collections: BTreeMap<String, Vec<String>>,
}
