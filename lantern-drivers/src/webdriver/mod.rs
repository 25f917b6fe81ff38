//! WebDriver-backed host page.
pub mod driver;
pub mod page;
pub mod scripts;

pub use driver::BrowserSession;
pub use page::WebDriverHost;
