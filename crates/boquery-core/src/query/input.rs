//! Accepted forms of criteria and order-criteria arguments.

use boquery_lang::{parse_criteria, parse_order_criteria};
use boquery_proto::{Criteria, OrderCriteria};

use crate::error::Result;

/// Anything the loader accepts as criteria: text, a parsed tree, or none.
pub trait IntoCriteria {
    fn into_criteria(self) -> Result<Option<Criteria>>;
}

impl IntoCriteria for &str {
    fn into_criteria(self) -> Result<Option<Criteria>> {
        Ok(parse_criteria(self)?)
    }
}

impl IntoCriteria for &String {
    fn into_criteria(self) -> Result<Option<Criteria>> {
        self.as_str().into_criteria()
    }
}

impl IntoCriteria for String {
    fn into_criteria(self) -> Result<Option<Criteria>> {
        self.as_str().into_criteria()
    }
}

impl IntoCriteria for Criteria {
    fn into_criteria(self) -> Result<Option<Criteria>> {
        Ok(Some(self))
    }
}

impl IntoCriteria for Option<Criteria> {
    fn into_criteria(self) -> Result<Option<Criteria>> {
        Ok(self)
    }
}

impl IntoCriteria for Option<&str> {
    fn into_criteria(self) -> Result<Option<Criteria>> {
        self.map_or(Ok(None), IntoCriteria::into_criteria)
    }
}

/// Anything the loader accepts as order criteria.
pub trait IntoOrderCriteria {
    fn into_order_criteria(self) -> Result<Option<OrderCriteria>>;
}

impl IntoOrderCriteria for &str {
    fn into_order_criteria(self) -> Result<Option<OrderCriteria>> {
        let order = parse_order_criteria(self)?;
        Ok((!order.is_empty()).then_some(order))
    }
}

impl IntoOrderCriteria for &String {
    fn into_order_criteria(self) -> Result<Option<OrderCriteria>> {
        self.as_str().into_order_criteria()
    }
}

impl IntoOrderCriteria for String {
    fn into_order_criteria(self) -> Result<Option<OrderCriteria>> {
        self.as_str().into_order_criteria()
    }
}

impl IntoOrderCriteria for OrderCriteria {
    fn into_order_criteria(self) -> Result<Option<OrderCriteria>> {
        Ok(Some(self))
    }
}

impl IntoOrderCriteria for Option<OrderCriteria> {
    fn into_order_criteria(self) -> Result<Option<OrderCriteria>> {
        Ok(self)
    }
}

impl IntoOrderCriteria for Option<&str> {
    fn into_order_criteria(self) -> Result<Option<OrderCriteria>> {
        self.map_or(Ok(None), IntoOrderCriteria::into_order_criteria)
    }
}
