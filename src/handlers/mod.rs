pub mod health;
pub mod diagnostics;
pub mod note_presence;
pub mod note_events;

pub use health::*;
pub use diagnostics::*;
pub use note_presence::*;
pub use note_events::*;
