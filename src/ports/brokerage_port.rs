//! Brokerage account and order submission port.

use crate::domain::error::AutotraderError;
use crate::domain::position::Position;
use crate::domain::trade::BracketOrder;

pub type OrderId = String;

pub trait BrokeragePort {
    /// `None` when no position is held for the symbol.
    fn get_position(&self, symbol: &str) -> Result<Option<Position>, AutotraderError>;

    fn get_buying_power(&self) -> Result<f64, AutotraderError>;

    /// Entry with attached stop-loss and take-profit legs.
    fn submit_bracket_order(&self, order: &BracketOrder) -> Result<OrderId, AutotraderError>;

    /// Close the entire position in `symbol`.
    fn submit_close_order(&self, symbol: &str) -> Result<OrderId, AutotraderError>;
}
