//! Logging shims. With the `defmt` feature the macros forward to `defmt`,
//! otherwise the arguments are evaluated and discarded.

#![allow(unused_macros)]

#[cfg(feature = "defmt")]
macro_rules! debug {
  ($($arg:expr),* $(,)?) => {
    ::defmt::debug!($($arg),*)
  };
}

#[cfg(feature = "defmt")]
macro_rules! info {
  ($($arg:expr),* $(,)?) => {
    ::defmt::info!($($arg),*)
  };
}

#[cfg(feature = "defmt")]
macro_rules! warn {
  ($($arg:expr),* $(,)?) => {
    ::defmt::warn!($($arg),*)
  };
}

#[cfg(feature = "defmt")]
macro_rules! error {
  ($($arg:expr),* $(,)?) => {
    ::defmt::error!($($arg),*)
  };
}

#[cfg(not(feature = "defmt"))]
macro_rules! debug {
  ($($arg:expr),* $(,)?) => {{
    let _ = ($($arg),*);
  }};
}

#[cfg(not(feature = "defmt"))]
macro_rules! info {
  ($($arg:expr),* $(,)?) => {{
    let _ = ($($arg),*);
  }};
}

#[cfg(not(feature = "defmt"))]
macro_rules! warn {
  ($($arg:expr),* $(,)?) => {{
    let _ = ($($arg),*);
  }};
}

#[cfg(not(feature = "defmt"))]
macro_rules! error {
  ($($arg:expr),* $(,)?) => {{
    let _ = ($($arg),*);
  }};
}
