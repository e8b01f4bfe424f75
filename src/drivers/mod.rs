//! Output device drivers.

pub mod ssr;

pub use ssr::SsrOutput;
