mod consolidate;
mod core;
mod error;
mod heading;
mod indent;
mod list;
mod mark_span;
mod marks;
mod ops;
mod preserve;
mod schema;
mod style;
mod transform;

pub use crate::consolidate::*;
pub use crate::core::*;
pub use crate::error::*;
pub use crate::heading::*;
pub use crate::indent::*;
pub use crate::list::*;
pub use crate::mark_span::*;
pub use crate::marks::*;
pub use crate::ops::*;
pub use crate::preserve::*;
pub use crate::schema::*;
pub use crate::style::*;
pub use crate::transform::*;
