pub mod health;
pub mod diagnostics;
pub mod error;
pub mod messages;
pub mod note;
pub mod note_events;
pub mod presence;

pub use health::*;
pub use diagnostics::*;
pub use error::*;
pub use messages::*;
pub use note::*;
pub use note_events::*;
pub use presence::*;
