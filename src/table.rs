pub mod column_widths;
pub mod render;
pub mod sheet;

pub use render::aggregate;
pub use sheet::{ParsedDocument, Row, Sheet};
