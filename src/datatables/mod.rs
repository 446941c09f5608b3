//! Grid widget protocol types
//!
//! ```text
//! datatables/
//! ├── params    # bracket-notation form pairs -> JSON parameter tree
//! ├── column    # Column descriptor and OrderDir
//! ├── request   # DatatablesRequest (normalized paging request)
//! └── response  # DatatablesResponse and the JSON envelopes
//! ```

pub mod column;
pub mod params;
pub mod request;
pub mod response;

pub use column::{Column, OrderDir};
pub use params::nest_pairs;
pub use request::DatatablesRequest;
pub use response::{DatatablesResponse, ErrorEnvelope, ResponseEnvelope};
