//! Vehicle to order matching
//!
//! Cross-references a public vehicle against orders in the restricted
//! collection of the same namespace. Read-only: a match is consumed only by
//! the vehicle contract's `MatchOrder`.

use serde::Serialize;

use crate::contracts::{Car, Order, ORDER_ASSET_TYPE, ORDER_COLLECTION};
use crate::ledger::{LedgerError, LedgerResult, TxContext};
use crate::query::Selector;

/// Fields an order must share exactly with a vehicle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCriteria {
    pub make: String,
    pub model: String,
    pub color: String,
}

impl MatchCriteria {
    pub fn from_car(car: &Car) -> Self {
        Self {
            make: car.make.clone(),
            model: car.model.clone(),
            color: car.color.clone(),
        }
    }

    /// `{"assetType":"Order","make":..,"model":..,"color":..}`
    pub fn selector(&self) -> Selector {
        Selector::all()
            .filter_eq("assetType", ORDER_ASSET_TYPE)
            .filter_eq("make", self.make.as_str())
            .filter_eq("model", self.model.as_str())
            .filter_eq("color", self.color.as_str())
    }

    /// Exact, case-sensitive comparison
    pub fn matches(&self, order: &Order) -> bool {
        order.make == self.make && order.model == self.model && order.color == self.color
    }
}

/// An order that matches a vehicle, with its key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedOrder {
    pub order_id: String,
    #[serde(flatten)]
    pub order: Order,
}

/// Lazily yields orders matching `criteria`, in key order.
///
/// The caller must be a member of the order collection; otherwise this fails
/// with `Unauthorized` before any record is read.
pub fn find_matches<'a>(
    ctx: &TxContext<'a>,
    criteria: &MatchCriteria,
) -> LedgerResult<impl Iterator<Item = LedgerResult<MatchedOrder>> + 'a> {
    let results = ctx.private_query(ORDER_COLLECTION, &criteria.selector())?;
    Ok(results.map(|item| {
        let m = item?;
        let order: Order =
            serde_json::from_value(m.value).map_err(|e| LedgerError::malformed("order", &m.key, e))?;
        Ok(MatchedOrder {
            order: order.validate(&m.key)?,
            order_id: m.key,
        })
    }))
}
