mod macros;

#[cfg(feature = "log")]
pub mod log;

#[cfg(feature = "log")]
pub use log::Context;
#[cfg(feature = "log")]
pub use slog;

use std::thread::Builder;

pub fn thread_named(name: &str) -> Builder {
    Builder::new().name(name.to_string())
}

#[doc(hidden)]
pub mod __private {
    pub use ansi_term::Colour;
    pub use atty;
}
