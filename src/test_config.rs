//! Shared proptest settings for the unit-test modules.
//!
//! Under Miri the case count drops to a handful so the interpreter finishes in
//! reasonable time; everywhere else the proptest default of 256 applies.

/// Number of cases each property test runs.
#[must_use]
pub const fn miri_case_count() -> u32 {
    if cfg!(miri) {
        5
    } else {
        256
    }
}

/// A `ProptestConfig` using [`miri_case_count`].
#[must_use]
pub fn proptest_config() -> proptest::test_runner::Config {
    proptest::test_runner::Config {
        cases: miri_case_count(),
        ..proptest::test_runner::Config::default()
    }
}
