pub mod list;
pub mod send;
pub mod serve;
