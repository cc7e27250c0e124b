//! suiterun browser layer
//!
//! Turns raw step strings into browser interactions:
//! - `locator`: `<strategy>=<value>` selector resolution
//! - `step`: pure parser for the step language
//! - `interpreter`: executes one step against a [`BrowserSession`]
//! - `webdriver`: W3C WebDriver implementation of the session traits
//!
//! # Architecture
//!
//! ```text
//! raw step ──► Command::parse ──► StepInterpreter::execute ──► log line
//!                   │                       │
//!            Locator::resolve        dyn BrowserSession
//!                                    (WebDriverSession | ScriptedSession)
//! ```

pub mod error;
pub mod interpreter;
pub mod locator;
pub mod session;
pub mod step;
pub mod webdriver;

#[cfg(any(test, feature = "test-util"))]
pub mod fake;

pub use error::{SessionError, SessionResult, StepError, StepFailure};
pub use interpreter::{StepInterpreter, ELEMENT_TIMEOUT};
pub use locator::{Locator, Strategy};
pub use session::{BrowserSession, ElementRef, SessionProvider};
pub use step::{Command, ElementTarget};
pub use webdriver::{WebDriverProvider, WebDriverSession};
