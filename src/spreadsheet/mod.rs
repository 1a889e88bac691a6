pub mod cell;
pub mod codec;
pub mod reference;
