//! Control-flow signals raised by access checks
//!
//! A [`Signal`] is not an error: it asks the middleware to stop running the
//! request callback and answer with a redirect or a not-found page instead.
//! Callbacks return `Result<_, Interrupt>`, so `?` carries a signal out of
//! any depth of helper calls to the single point where responses are built.

use supaguard_common::Error;

/// Deliberate transfer of control out of a request callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Send the user to the configured sign-in path
    RedirectToSignIn,
    /// Send the user to an absolute URL or a path relative to the request
    RedirectToUrl(String),
    /// Render the application's not-found page
    ForceNotFound,
}

impl Signal {
    /// Stable identifier, used in logs
    pub fn code(&self) -> &'static str {
        match self {
            Signal::RedirectToSignIn => "SUPABASE_PROTECT_REDIRECT_TO_SIGN_IN",
            Signal::RedirectToUrl(_) => "SUPABASE_PROTECT_REDIRECT_TO_URL",
            Signal::ForceNotFound => "SUPABASE_PROTECT_FORCE_NOT_FOUND",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::RedirectToUrl(url) => write!(f, "{} ({})", self.code(), url),
            _ => f.write_str(self.code()),
        }
    }
}

/// Why a request callback stopped early
#[derive(Debug)]
pub enum Interrupt {
    /// Intentional redirect or not-found; resolved into a response
    Signal(Signal),
    /// Genuine failure; passed through to the host's error handling untouched
    Failure(Error),
}

impl Interrupt {
    pub fn as_signal(&self) -> Option<&Signal> {
        match self {
            Interrupt::Signal(signal) => Some(signal),
            Interrupt::Failure(_) => None,
        }
    }
}

impl std::fmt::Display for Interrupt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interrupt::Signal(signal) => write!(f, "control flow signal: {}", signal),
            Interrupt::Failure(error) => write!(f, "{}", error),
        }
    }
}

impl From<Signal> for Interrupt {
    fn from(signal: Signal) -> Self {
        Interrupt::Signal(signal)
    }
}

impl From<Error> for Interrupt {
    fn from(error: Error) -> Self {
        Interrupt::Failure(error)
    }
}

impl From<anyhow::Error> for Interrupt {
    fn from(error: anyhow::Error) -> Self {
        Interrupt::Failure(Error::Unexpected(error))
    }
}
