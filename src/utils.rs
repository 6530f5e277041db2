mod increment_u32_id;
pub use increment_u32_id::*;
mod lock_or_recover;
pub use lock_or_recover::*;
mod panic_message;
pub use panic_message::*;
