//! Platform glue that has no portable equivalent.

pub mod android_utils;
