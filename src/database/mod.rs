pub mod column;
pub mod range;
pub mod schema;
pub mod table;
