//! Vehicle lifecycle contract
//!
//! `NonExistent -> InFactory -> AssignedToDealer -> Registered`

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    collect_history, decode_matches, decode_range, expect_args, to_payload, unknown_function, Contract,
    Order, ORDER_COLLECTION, VEHICLE_NAMESPACE,
};
use crate::access::{Action, AssetKind};
use crate::ledger::{LedgerError, LedgerResult, TxContext};
use crate::matching::{self, MatchCriteria};
use crate::query::{Selector, SortSpec};

const ASSET_TYPE: &str = "car";
const REGISTERED_PREFIX: &str = "Registered to ";
const PLATE_INFIX: &str = " with plate number ";

/// Lifecycle state of a vehicle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VehicleStatus {
    InFactory,
    AssignedToDealer,
    Registered { owner: String, plate: String },
}

impl VehicleStatus {
    pub fn is_registered(&self) -> bool {
        matches!(self, VehicleStatus::Registered { .. })
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehicleStatus::InFactory => write!(f, "InFactory"),
            VehicleStatus::AssignedToDealer => write!(f, "AssignedToDealer"),
            VehicleStatus::Registered { owner, plate } => {
                write!(f, "{}{}{}{}", REGISTERED_PREFIX, owner, PLATE_INFIX, plate)
            }
        }
    }
}

impl From<VehicleStatus> for String {
    fn from(status: VehicleStatus) -> Self {
        status.to_string()
    }
}

impl TryFrom<String> for VehicleStatus {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        match raw.as_str() {
            "InFactory" => Ok(VehicleStatus::InFactory),
            "AssignedToDealer" => Ok(VehicleStatus::AssignedToDealer),
            other => other
                .strip_prefix(REGISTERED_PREFIX)
                .and_then(|rest| rest.rsplit_once(PLATE_INFIX))
                .map(|(owner, plate)| VehicleStatus::Registered {
                    owner: owner.to_string(),
                    plate: plate.to_string(),
                })
                .ok_or_else(|| format!("unknown vehicle status: {:?}", raw)),
        }
    }
}

/// Public vehicle record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Car {
    pub asset_type: String,
    pub car_id: String,
    pub color: String,
    pub date_of_manufacture: String,
    pub make: String,
    pub model: String,
    pub owned_by: String,
    pub status: VehicleStatus,
}

impl Car {
    /// Semantic checks beyond the JSON shape.
    fn validate(self, key: &str) -> LedgerResult<Self> {
        if self.asset_type != ASSET_TYPE {
            return Err(LedgerError::malformed(
                "car",
                key,
                format!("assetType is {:?}", self.asset_type),
            ));
        }
        if self.car_id != key {
            return Err(LedgerError::malformed("car", key, format!("carId is {:?}", self.car_id)));
        }
        Ok(self)
    }
}

/// Vehicle contract over the `vehicle` namespace
pub struct CarContract;

impl CarContract {
    const FUNCTIONS: &'static [&'static str] = &[
        "CarExists",
        "CreateCar",
        "ReadCar",
        "DeleteCar",
        "GetAllCars",
        "GetCarsByRange",
        "GetCarHistory",
        "QueryCars",
        "GetMatchingOrders",
        "MatchOrder",
        "RegisterCar",
    ];

    fn exists(ctx: &mut TxContext<'_>, car_id: &str) -> LedgerResult<bool> {
        ctx.require(AssetKind::Vehicle, Action::Read)?;
        ctx.state_exists(car_id)
    }

    fn create(ctx: &mut TxContext<'_>, args: [&str; 6]) -> LedgerResult<String> {
        let [car_id, make, model, color, manufacturer, date_of_manufacture] = args;
        ctx.require(AssetKind::Vehicle, Action::Create)?;

        if ctx.state_exists(car_id)? {
            return Err(LedgerError::already_exists("car", car_id));
        }

        let car = Car {
            asset_type: ASSET_TYPE.to_string(),
            car_id: car_id.to_string(),
            color: color.to_string(),
            date_of_manufacture: date_of_manufacture.to_string(),
            make: make.to_string(),
            model: model.to_string(),
            owned_by: manufacturer.to_string(),
            status: VehicleStatus::InFactory,
        };
        ctx.put_json(car_id, &car)?;
        Ok(format!("successfully added car {}", car_id))
    }

    /// Loads a car without a policy check; callers authorize first.
    pub(crate) fn load(ctx: &mut TxContext<'_>, car_id: &str) -> LedgerResult<Car> {
        ctx.get_json::<Car>("car", car_id)?
            .ok_or_else(|| LedgerError::not_found("car", car_id))?
            .validate(car_id)
    }

    fn read(ctx: &mut TxContext<'_>, car_id: &str) -> LedgerResult<Car> {
        ctx.require(AssetKind::Vehicle, Action::Read)?;
        Self::load(ctx, car_id)
    }

    fn delete(ctx: &mut TxContext<'_>, car_id: &str) -> LedgerResult<String> {
        ctx.require(AssetKind::Vehicle, Action::Delete)?;
        if !ctx.state_exists(car_id)? {
            return Err(LedgerError::not_found("car", car_id));
        }
        ctx.del_state(car_id)?;
        Ok(format!("car {} is deleted from the world state", car_id))
    }

    fn all(ctx: &mut TxContext<'_>) -> LedgerResult<Vec<Car>> {
        ctx.require(AssetKind::Vehicle, Action::Query)?;
        let selector = Selector::all()
            .filter_eq("assetType", ASSET_TYPE)
            .with_sort(SortSpec::desc("carId"));
        decode_matches("car", ctx.query(&selector)?, Car::validate)
    }

    fn by_range(ctx: &mut TxContext<'_>, start: &str, end: &str) -> LedgerResult<Vec<Car>> {
        ctx.require(AssetKind::Vehicle, Action::Query)?;
        decode_range("car", ctx.state_by_range(start, end)?, Car::validate)
    }

    fn query(ctx: &mut TxContext<'_>, query: &str) -> LedgerResult<Vec<Car>> {
        ctx.require(AssetKind::Vehicle, Action::Query)?;
        let selector = Selector::parse(query)?;
        decode_matches("car", ctx.query(&selector)?, Car::validate)
    }

    fn history(ctx: &mut TxContext<'_>, car_id: &str) -> LedgerResult<Value> {
        ctx.require(AssetKind::Vehicle, Action::History)?;
        to_payload(&collect_history("car", ctx.history_for_key(car_id)?, Car::validate)?)
    }

    fn matching_orders(ctx: &mut TxContext<'_>, car_id: &str) -> LedgerResult<Value> {
        ctx.require(AssetKind::Vehicle, Action::Match)?;
        let car = Self::load(ctx, car_id)?;
        let matches = matching::find_matches(ctx, &MatchCriteria::from_car(&car))?
            .collect::<LedgerResult<Vec<_>>>()?;
        to_payload(&matches)
    }

    /// Consumes an order and assigns the car to its dealer in one unit of work.
    fn match_order(ctx: &mut TxContext<'_>, car_id: &str, order_id: &str) -> LedgerResult<String> {
        ctx.require(AssetKind::Vehicle, Action::Match)?;

        let order = ctx
            .get_private_json::<Order>(ORDER_COLLECTION, "order", order_id)?
            .ok_or_else(|| LedgerError::not_found("order", order_id))?
            .validate(order_id)?;
        let mut car = Self::load(ctx, car_id)?;

        if car.status.is_registered() {
            return Err(LedgerError::no_match(format!(
                "car {} is already registered and cannot be assigned",
                car_id
            )));
        }
        if !MatchCriteria::from_car(&car).matches(&order) {
            return Err(LedgerError::no_match(format!(
                "order {} does not match car {}",
                order_id, car_id
            )));
        }

        car.owned_by = order.dealer_name.clone();
        car.status = VehicleStatus::AssignedToDealer;

        ctx.del_private(ORDER_COLLECTION, order_id)?;
        ctx.put_json(car_id, &car)?;
        Ok(format!(
            "deleted order {} and assigned {} to {}",
            order_id, car_id, order.dealer_name
        ))
    }

    /// Permitted from any existing state, not only `AssignedToDealer`.
    fn register(ctx: &mut TxContext<'_>, car_id: &str, owner: &str, plate: &str) -> LedgerResult<String> {
        ctx.require(AssetKind::Vehicle, Action::Register)?;
        let mut car = Self::load(ctx, car_id)?;

        car.status = VehicleStatus::Registered {
            owner: owner.to_string(),
            plate: plate.to_string(),
        };
        car.owned_by = owner.to_string();
        ctx.put_json(car_id, &car)?;
        Ok(format!("car {} successfully registered to {}", car_id, owner))
    }
}

impl Contract for CarContract {
    fn name(&self) -> &'static str {
        "CarContract"
    }

    fn namespace(&self) -> &'static str {
        VEHICLE_NAMESPACE
    }

    fn functions(&self) -> &'static [&'static str] {
        Self::FUNCTIONS
    }

    fn invoke(&self, ctx: &mut TxContext<'_>, function: &str, args: &[String]) -> LedgerResult<Value> {
        match function {
            "CarExists" => {
                let [car_id] = expect_args::<1>(function, args)?;
                Ok(Value::Bool(Self::exists(ctx, car_id)?))
            }
            "CreateCar" => Ok(Value::String(Self::create(ctx, expect_args::<6>(function, args)?)?)),
            "ReadCar" => {
                let [car_id] = expect_args::<1>(function, args)?;
                to_payload(&Self::read(ctx, car_id)?)
            }
            "DeleteCar" => {
                let [car_id] = expect_args::<1>(function, args)?;
                Ok(Value::String(Self::delete(ctx, car_id)?))
            }
            "GetAllCars" => {
                let [] = expect_args::<0>(function, args)?;
                to_payload(&Self::all(ctx)?)
            }
            "GetCarsByRange" => {
                let [start, end] = expect_args::<2>(function, args)?;
                to_payload(&Self::by_range(ctx, start, end)?)
            }
            "GetCarHistory" => {
                let [car_id] = expect_args::<1>(function, args)?;
                Self::history(ctx, car_id)
            }
            "QueryCars" => {
                let [query] = expect_args::<1>(function, args)?;
                to_payload(&Self::query(ctx, query)?)
            }
            "GetMatchingOrders" => {
                let [car_id] = expect_args::<1>(function, args)?;
                Self::matching_orders(ctx, car_id)
            }
            "MatchOrder" => {
                let [car_id, order_id] = expect_args::<2>(function, args)?;
                Ok(Value::String(Self::match_order(ctx, car_id, order_id)?))
            }
            "RegisterCar" => {
                let [car_id, owner, plate] = expect_args::<3>(function, args)?;
                Ok(Value::String(Self::register(ctx, car_id, owner, plate)?))
            }
            other => Err(unknown_function(self.name(), other)),
        }
    }
}
