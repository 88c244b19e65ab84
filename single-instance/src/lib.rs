//! Allow only one running instance of an application, and let later launches
//! notify the running one before they exit.
//!
//! ```no_run
//! use single_instance::AppId;
//! use single_instance::Coordinator;
//! use single_instance::Role;
//!
//! let app_id: AppId = "6f9619ff-8b86-d011-b42d-00c04fc964ff".parse().unwrap();
//! let mut coordinator = Coordinator::new(app_id);
//! coordinator
//!     .on_started(|| println!("Starting up"))
//!     .on_attempt_detected(|| println!("Someone tried to start another instance"));
//!
//! // A secondary instance exits inside `run`
//! if coordinator.run().unwrap() == Role::Primary {
//!     // ... run the application, keeping `coordinator` alive
//! }
//! ```

mod activator;
mod channel;
mod coordinator;
mod error;
mod gate;
mod identity;
mod options;
pub use activator::*;
pub use channel::try_notify;
pub use channel::Listener;
pub use channel::Wake;
pub use coordinator::*;
pub use error::*;
pub use gate::try_acquire;
pub use gate::Ownership;
pub use identity::*;
pub use options::*;
