//! Watchlist port.

use crate::domain::error::AutotraderError;
use crate::domain::watchlist::WatchlistEntry;

pub trait WatchlistPort {
    /// Active entries for the user.
    fn watchlist(&self, user_id: i64) -> Result<Vec<WatchlistEntry>, AutotraderError>;
}
