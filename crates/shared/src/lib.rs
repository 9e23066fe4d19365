pub mod defaults;
pub mod domain;
pub mod error;
pub mod records;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
