pub mod registry;
mod worker;
