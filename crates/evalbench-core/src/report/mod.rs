pub mod console;
pub mod csv;
