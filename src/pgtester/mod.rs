pub mod pg;
pub mod test_harness;
pub mod version;
