pub mod chrome_driver;
pub mod page_driver;

pub use chrome_driver::ChromeDriver;
pub use page_driver::{ElementHandle, Locator, PageDriver, WindowGeometry};
