pub mod library;
pub mod notifications;

pub use library::KodiLibrary;
pub use notifications::KodiNotifications;
