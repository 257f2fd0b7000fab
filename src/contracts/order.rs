//! Dealer order contract
//!
//! Orders live only in the `CollectionOrder` restricted collection of the
//! vehicle namespace. Order details arrive as transient data so they never
//! appear in the public arguments of the operation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{decode_matches, decode_range, expect_args, to_payload, transient_str, unknown_function, Contract};
use super::{ORDER_COLLECTION, VEHICLE_NAMESPACE};
use crate::access::{Action, AssetKind};
use crate::ledger::{LedgerError, LedgerResult, TxContext};
use crate::query::Selector;

pub(crate) const ORDER_ASSET_TYPE: &str = "Order";

/// Restricted dealer order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Order {
    pub asset_type: String,
    pub color: String,
    pub dealer_name: String,
    pub make: String,
    pub model: String,
}

impl Order {
    pub fn new(
        make: impl Into<String>,
        model: impl Into<String>,
        color: impl Into<String>,
        dealer_name: impl Into<String>,
    ) -> Self {
        Self {
            asset_type: ORDER_ASSET_TYPE.to_string(),
            color: color.into(),
            dealer_name: dealer_name.into(),
            make: make.into(),
            model: model.into(),
        }
    }

    pub(crate) fn validate(self, key: &str) -> LedgerResult<Self> {
        if self.asset_type != ORDER_ASSET_TYPE {
            return Err(LedgerError::malformed(
                "order",
                key,
                format!("assetType is {:?}", self.asset_type),
            ));
        }
        Ok(self)
    }
}

/// Order contract over `vehicle` / `CollectionOrder`
pub struct OrderContract;

impl OrderContract {
    const FUNCTIONS: &'static [&'static str] = &[
        "OrderExists",
        "CreateOrder",
        "ReadOrder",
        "DeleteOrder",
        "GetAllOrders",
        "GetOrdersByRange",
    ];

    fn exists(ctx: &mut TxContext<'_>, order_id: &str) -> LedgerResult<bool> {
        ctx.require(AssetKind::Order, Action::Read)?;
        Ok(ctx.get_private(ORDER_COLLECTION, order_id)?.is_some())
    }

    fn create(ctx: &mut TxContext<'_>, order_id: &str) -> LedgerResult<String> {
        ctx.require(AssetKind::Order, Action::Create)?;
        if ctx.get_private(ORDER_COLLECTION, order_id)?.is_some() {
            return Err(LedgerError::already_exists("order", order_id));
        }

        let order = Order::new(
            transient_str(ctx, "make")?,
            transient_str(ctx, "model")?,
            transient_str(ctx, "color")?,
            transient_str(ctx, "dealerName")?,
        );
        ctx.put_private_json(ORDER_COLLECTION, order_id, &order)?;
        Ok(format!("added order {} to the collection", order_id))
    }

    fn read(ctx: &mut TxContext<'_>, order_id: &str) -> LedgerResult<Order> {
        ctx.require(AssetKind::Order, Action::Read)?;
        ctx.get_private_json::<Order>(ORDER_COLLECTION, "order", order_id)?
            .ok_or_else(|| LedgerError::not_found("order", order_id))?
            .validate(order_id)
    }

    fn delete(ctx: &mut TxContext<'_>, order_id: &str) -> LedgerResult<String> {
        ctx.require(AssetKind::Order, Action::Delete)?;
        if ctx.get_private(ORDER_COLLECTION, order_id)?.is_none() {
            return Err(LedgerError::not_found("order", order_id));
        }
        ctx.del_private(ORDER_COLLECTION, order_id)?;
        Ok(format!("order {} is deleted from the collection", order_id))
    }

    fn all(ctx: &mut TxContext<'_>) -> LedgerResult<Vec<Order>> {
        ctx.require(AssetKind::Order, Action::Query)?;
        let selector = Selector::all().filter_eq("assetType", ORDER_ASSET_TYPE);
        decode_matches("order", ctx.private_query(ORDER_COLLECTION, &selector)?, Order::validate)
    }

    fn by_range(ctx: &mut TxContext<'_>, start: &str, end: &str) -> LedgerResult<Vec<Order>> {
        ctx.require(AssetKind::Order, Action::Query)?;
        decode_range("order", ctx.private_by_range(ORDER_COLLECTION, start, end)?, Order::validate)
    }
}

impl Contract for OrderContract {
    fn name(&self) -> &'static str {
        "OrderContract"
    }

    fn namespace(&self) -> &'static str {
        VEHICLE_NAMESPACE
    }

    fn functions(&self) -> &'static [&'static str] {
        Self::FUNCTIONS
    }

    fn invoke(&self, ctx: &mut TxContext<'_>, function: &str, args: &[String]) -> LedgerResult<Value> {
        match function {
            "OrderExists" => {
                let [order_id] = expect_args::<1>(function, args)?;
                Ok(Value::Bool(Self::exists(ctx, order_id)?))
            }
            "CreateOrder" => {
                let [order_id] = expect_args::<1>(function, args)?;
                Ok(Value::String(Self::create(ctx, order_id)?))
            }
            "ReadOrder" => {
                let [order_id] = expect_args::<1>(function, args)?;
                to_payload(&Self::read(ctx, order_id)?)
            }
            "DeleteOrder" => {
                let [order_id] = expect_args::<1>(function, args)?;
                Ok(Value::String(Self::delete(ctx, order_id)?))
            }
            "GetAllOrders" => {
                let [] = expect_args::<0>(function, args)?;
                to_payload(&Self::all(ctx)?)
            }
            "GetOrdersByRange" => {
                let [start, end] = expect_args::<2>(function, args)?;
                to_payload(&Self::by_range(ctx, start, end)?)
            }
            other => Err(unknown_function(self.name(), other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_wire_shape() {
        let order = Order::new("Toyota", "Corolla", "Red", "Dealer9");
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["assetType"], "Order");
        assert_eq!(json["dealerName"], "Dealer9");
        let back: Order = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }

    #[test]
    fn test_order_validation() {
        let mut order = Order::new("Toyota", "Corolla", "Red", "Dealer9");
        order.asset_type = "car".to_string();
        assert!(order.validate("O1").is_err());
    }
}
