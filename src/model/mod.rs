//! Data model shared by the rule engine, the outline builder and layout providers.
//!
//! Layout providers report raw [`BlockGeometry`] per page; the builder turns it
//! into reading-order [`LineRecord`]s, and matches accumulate into an [`Outline`].

mod line;
mod outline;

pub use line::{is_bold_font, round_size, BlockGeometry, LineGeometry, LineRecord, SpanGeometry};
pub use outline::{Outline, OutlineEntry};
