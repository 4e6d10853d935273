//! Product and order listing: filters, sorting and pagination.

mod filter;
mod query;
mod results;

pub use filter::{escape_like, order_status_condition, Filter, FilterValue};
pub use query::{OrderQuery, ProductQuery, SortOption, DEFAULT_PER_PAGE, MAX_PER_PAGE};
pub use results::Page;
