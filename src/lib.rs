//! List filtering and pagination for the nurse job board views.
//!
//! Records come from the hosted backend through [`fetch::RecordSource`],
//! are filtered by [`filter::FilterPipeline`], paged by
//! [`paginate::Paginator`], and the user's filter selections persist through
//! [`store::FilterStore`]. [`session::FilterSession`] ties these together
//! for one view.

pub mod config;
pub mod db;
pub mod error;
pub mod experience;
pub mod fetch;
pub mod filter;
pub mod models;
pub mod normalize;
pub mod paginate;
pub mod session;
pub mod store;

pub use error::{BoardError, Result};
pub use filter::{FilterPipeline, FilterState};
pub use models::{Record, View};
pub use session::FilterSession;
