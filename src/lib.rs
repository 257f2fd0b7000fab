//! assetledger - shared, auditable asset records for organizations that do
//! not trust each other
//!
//! Layers, leaves first:
//! - `storage`: versioned key-value frames with per-key history
//! - `query`: selector evaluation over a partition
//! - `access`: credential and policy gate
//! - `ledger`: transaction context and the commit engine
//! - `contracts` and `matching`: vehicle, order and batch lifecycles

pub mod access;
pub mod cli;
pub mod contracts;
pub mod ledger;
pub mod matching;
pub mod observability;
pub mod query;
pub mod storage;
