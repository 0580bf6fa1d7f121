//! Logging shim: forwards to `defmt` when the feature is on, otherwise compiles away.

#![allow(unused_macros)]

macro_rules! debug {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        ::defmt::debug!($fmt $(, $arg)*);
        #[cfg(not(feature = "defmt"))]
        let _ = ($fmt, $(&$arg),*);
    }};
}

macro_rules! warn {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        ::defmt::warn!($fmt $(, $arg)*);
        #[cfg(not(feature = "defmt"))]
        let _ = ($fmt, $(&$arg),*);
    }};
}
