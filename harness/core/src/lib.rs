mod shutdown;

pub mod prelude {
    pub use crate::shutdown::{RunInterruptedError, ShutdownHandle, ShutdownListener};
}
