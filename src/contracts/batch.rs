//! Commodity batch contract
//!
//! `Harvested -> AtMiller -> AtRetailer`. Pricing lives in the
//! `ricePrivateData` collection and is written from transient input only.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    collect_history, decode_matches, expect_args, to_payload, unknown_function, Contract, BATCH_NAMESPACE,
    BATCH_PRIVATE_COLLECTION,
};
use crate::access::{Action, AssetKind};
use crate::ledger::{LedgerError, LedgerResult, TxContext};
use crate::query::Selector;

const ASSET_TYPE: &str = "batch";
const PRIVATE_DETAILS_KEY: &str = "privateDetails";

/// Stage of a batch; also names its current holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    Harvested,
    AtMiller,
    AtRetailer,
}

impl BatchStatus {
    pub fn holder(&self) -> &'static str {
        match self {
            BatchStatus::Harvested => "Farmer",
            BatchStatus::AtMiller => "Miller",
            BatchStatus::AtRetailer => "Retailer",
        }
    }
}

/// Public batch record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RiceBatch {
    pub asset_type: String,
    #[serde(rename = "batchID")]
    pub batch_id: String,
    pub farmer: String,
    pub harvest_date: String,
    pub quantity: u64,
    pub location: String,
    pub quality_grade: String,
    pub current_holder: String,
    pub status: BatchStatus,
}

impl RiceBatch {
    fn validate(self, key: &str) -> LedgerResult<Self> {
        if self.asset_type != ASSET_TYPE {
            return Err(LedgerError::malformed(
                "batch",
                key,
                format!("assetType is {:?}", self.asset_type),
            ));
        }
        if self.batch_id != key {
            return Err(LedgerError::malformed("batch", key, format!("batchID is {:?}", self.batch_id)));
        }
        if self.current_holder != self.status.holder() {
            return Err(LedgerError::malformed(
                "batch",
                key,
                format!("holder {:?} does not match status {:?}", self.current_holder, self.status),
            ));
        }
        Ok(self)
    }

    fn advance(&mut self, status: BatchStatus) {
        self.status = status;
        self.current_holder = status.holder().to_string();
    }
}

/// Restricted pricing details of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PrivateDetails {
    pub price_per_kg: f64,
    pub grade_note: String,
}

impl PrivateDetails {
    fn validate(self, key: &str) -> LedgerResult<Self> {
        if !self.price_per_kg.is_finite() || self.price_per_kg < 0.0 {
            return Err(LedgerError::malformed(
                "private details",
                key,
                format!("pricePerKg is {}", self.price_per_kg),
            ));
        }
        Ok(self)
    }
}

/// Parses a quantity; signs, blanks and fractions are rejected.
fn parse_quantity(raw: &str) -> LedgerResult<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LedgerError::invalid_argument(format!("quantity {:?} is not a whole number", raw)));
    }
    raw.parse::<u64>()
        .map_err(|e| LedgerError::invalid_argument(format!("quantity {:?}: {}", raw, e)))
}

/// Batch contract over the `batch` namespace
pub struct RiceContract;

impl RiceContract {
    const FUNCTIONS: &'static [&'static str] = &[
        "AddRiceBatch",
        "AddPrivateDetails",
        "TransferToMiller",
        "TransferToRetailer",
        "ReadRiceBatch",
        "ReadPrivateDetails",
        "QueryByLocation",
        "QueryByQuality",
        "RiceBatchExists",
        "GetBatchHistory",
        "QueryBatches",
    ];

    fn add(ctx: &mut TxContext<'_>, args: [&str; 5]) -> LedgerResult<String> {
        let [batch_id, harvest_date, quantity, location, quality_grade] = args;
        ctx.require(AssetKind::Batch, Action::Create)?;

        if ctx.state_exists(batch_id)? {
            return Err(LedgerError::already_exists("batch", batch_id));
        }
        let quantity = parse_quantity(quantity)?;

        let status = BatchStatus::Harvested;
        let batch = RiceBatch {
            asset_type: ASSET_TYPE.to_string(),
            batch_id: batch_id.to_string(),
            farmer: ctx.credential().client_id.clone(),
            harvest_date: harvest_date.to_string(),
            quantity,
            location: location.to_string(),
            quality_grade: quality_grade.to_string(),
            current_holder: status.holder().to_string(),
            status,
        };
        ctx.put_json(batch_id, &batch)?;
        Ok(format!("added batch {}", batch_id))
    }

    fn add_private(ctx: &mut TxContext<'_>, batch_id: &str) -> LedgerResult<String> {
        ctx.require(AssetKind::Batch, Action::WritePrivate)?;

        let raw = ctx.transient(PRIVATE_DETAILS_KEY).map(<[u8]>::to_vec).ok_or_else(|| {
            LedgerError::invalid_argument(format!("{} key not found in transient map", PRIVATE_DETAILS_KEY))
        })?;
        let details: PrivateDetails = serde_json::from_slice(&raw)
            .map_err(|e| LedgerError::invalid_argument(format!("cannot parse {}: {}", PRIVATE_DETAILS_KEY, e)))?;
        let details = details
            .validate(batch_id)
            .map_err(|e| LedgerError::invalid_argument(e.message().to_string()))?;

        if !ctx.state_exists(batch_id)? {
            return Err(LedgerError::not_found("batch", batch_id));
        }
        ctx.put_private_json(BATCH_PRIVATE_COLLECTION, batch_id, &details)?;
        Ok(format!("stored private details for batch {}", batch_id))
    }

    fn load(ctx: &mut TxContext<'_>, batch_id: &str) -> LedgerResult<RiceBatch> {
        ctx.get_json::<RiceBatch>("batch", batch_id)?
            .ok_or_else(|| LedgerError::not_found("batch", batch_id))?
            .validate(batch_id)
    }

    /// Unconditional once the batch exists.
    fn transfer(ctx: &mut TxContext<'_>, batch_id: &str, to: BatchStatus) -> LedgerResult<String> {
        ctx.require(AssetKind::Batch, Action::Transfer)?;
        let mut batch = Self::load(ctx, batch_id)?;
        batch.advance(to);
        ctx.put_json(batch_id, &batch)?;
        Ok(format!("batch {} transferred to {}", batch_id, to.holder()))
    }

    fn read(ctx: &mut TxContext<'_>, batch_id: &str) -> LedgerResult<RiceBatch> {
        ctx.require(AssetKind::Batch, Action::Read)?;
        Self::load(ctx, batch_id)
    }

    fn read_private(ctx: &mut TxContext<'_>, batch_id: &str) -> LedgerResult<PrivateDetails> {
        ctx.require(AssetKind::Batch, Action::ReadPrivate)?;
        ctx.get_private_json::<PrivateDetails>(BATCH_PRIVATE_COLLECTION, "private details", batch_id)?
            .ok_or_else(|| LedgerError::not_found("private details for batch", batch_id))?
            .validate(batch_id)
    }

    fn exists(ctx: &mut TxContext<'_>, batch_id: &str) -> LedgerResult<bool> {
        ctx.require(AssetKind::Batch, Action::Read)?;
        ctx.state_exists(batch_id)
    }

    fn query_field(ctx: &mut TxContext<'_>, field: &str, value: &str) -> LedgerResult<Vec<RiceBatch>> {
        ctx.require(AssetKind::Batch, Action::Query)?;
        let selector = Selector::all()
            .filter_eq("assetType", ASSET_TYPE)
            .filter_eq(field, value);
        decode_matches("batch", ctx.query(&selector)?, RiceBatch::validate)
    }

    fn query(ctx: &mut TxContext<'_>, query: &str) -> LedgerResult<Vec<RiceBatch>> {
        ctx.require(AssetKind::Batch, Action::Query)?;
        let selector = Selector::parse(query)?;
        decode_matches("batch", ctx.query(&selector)?, RiceBatch::validate)
    }

    fn history(ctx: &mut TxContext<'_>, batch_id: &str) -> LedgerResult<Value> {
        ctx.require(AssetKind::Batch, Action::History)?;
        to_payload(&collect_history("batch", ctx.history_for_key(batch_id)?, RiceBatch::validate)?)
    }
}

impl Contract for RiceContract {
    fn name(&self) -> &'static str {
        "RiceContract"
    }

    fn namespace(&self) -> &'static str {
        BATCH_NAMESPACE
    }

    fn functions(&self) -> &'static [&'static str] {
        Self::FUNCTIONS
    }

    fn invoke(&self, ctx: &mut TxContext<'_>, function: &str, args: &[String]) -> LedgerResult<Value> {
        match function {
            "AddRiceBatch" => Ok(Value::String(Self::add(ctx, expect_args::<5>(function, args)?)?)),
            "AddPrivateDetails" => {
                let [batch_id] = expect_args::<1>(function, args)?;
                Ok(Value::String(Self::add_private(ctx, batch_id)?))
            }
            "TransferToMiller" => {
                let [batch_id] = expect_args::<1>(function, args)?;
                Ok(Value::String(Self::transfer(ctx, batch_id, BatchStatus::AtMiller)?))
            }
            "TransferToRetailer" => {
                let [batch_id] = expect_args::<1>(function, args)?;
                Ok(Value::String(Self::transfer(ctx, batch_id, BatchStatus::AtRetailer)?))
            }
            "ReadRiceBatch" => {
                let [batch_id] = expect_args::<1>(function, args)?;
                to_payload(&Self::read(ctx, batch_id)?)
            }
            "ReadPrivateDetails" => {
                let [batch_id] = expect_args::<1>(function, args)?;
                to_payload(&Self::read_private(ctx, batch_id)?)
            }
            "QueryByLocation" => {
                let [location] = expect_args::<1>(function, args)?;
                to_payload(&Self::query_field(ctx, "location", location)?)
            }
            "QueryByQuality" => {
                let [quality] = expect_args::<1>(function, args)?;
                to_payload(&Self::query_field(ctx, "qualityGrade", quality)?)
            }
            "RiceBatchExists" => {
                let [batch_id] = expect_args::<1>(function, args)?;
                Ok(Value::Bool(Self::exists(ctx, batch_id)?))
            }
            "GetBatchHistory" => {
                let [batch_id] = expect_args::<1>(function, args)?;
                Self::history(ctx, batch_id)
            }
            "QueryBatches" => {
                let [query] = expect_args::<1>(function, args)?;
                to_payload(&Self::query(ctx, query)?)
            }
            other => Err(unknown_function(self.name(), other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerErrorKind;

    #[test]
    fn test_quantity_is_strict() {
        assert_eq!(parse_quantity("500").unwrap(), 500);
        for bad in ["", "-5", "+5", "12.5", "1e3", " 7", "ten"] {
            let err = parse_quantity(bad).unwrap_err();
            assert_eq!(err.kind(), LedgerErrorKind::InvalidArgument, "{:?}", bad);
        }
        assert!(parse_quantity("99999999999999999999999").is_err());
    }

    #[test]
    fn test_batch_wire_shape() {
        let json = r#"{"assetType":"batch","batchID":"B1","farmer":"farmer-1","harvestDate":"2024-02-01",
                       "quantity":500,"location":"Kuttanad","qualityGrade":"A","currentHolder":"Farmer",
                       "status":"Harvested"}"#;
        let batch: RiceBatch = serde_json::from_str(json).unwrap();
        assert_eq!(batch.status, BatchStatus::Harvested);
        assert!(batch.clone().validate("B1").is_ok());

        let mut moved = batch;
        moved.advance(BatchStatus::AtMiller);
        assert_eq!(moved.current_holder, "Miller");
        let out = serde_json::to_value(&moved).unwrap();
        assert_eq!(out["batchID"], "B1");
        assert_eq!(out["status"], "AtMiller");
    }

    #[test]
    fn test_holder_must_agree_with_status() {
        let json = r#"{"assetType":"batch","batchID":"B1","farmer":"f","harvestDate":"d","quantity":1,
                       "location":"l","qualityGrade":"A","currentHolder":"Retailer","status":"Harvested"}"#;
        let batch: RiceBatch = serde_json::from_str(json).unwrap();
        assert_eq!(batch.validate("B1").unwrap_err().kind(), LedgerErrorKind::MalformedData);
    }

    #[test]
    fn test_private_details_checks() {
        let ok: PrivateDetails = serde_json::from_str(r#"{"pricePerKg":42.5,"gradeNote":"premium"}"#).unwrap();
        assert!(ok.validate("B1").is_ok());

        let negative = PrivateDetails {
            price_per_kg: -1.0,
            grade_note: String::new(),
        };
        assert!(negative.validate("B1").is_err());
        assert!(serde_json::from_str::<PrivateDetails>(r#"{"pricePerKg":1,"gradeNote":"x","extra":1}"#).is_err());
    }
}
