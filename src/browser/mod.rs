mod launch;
mod login;

pub use launch::{connect_to_browser, launch_browser, open_session};
pub use login::login;
