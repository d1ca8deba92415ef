pub mod csv;
pub mod submissions;
