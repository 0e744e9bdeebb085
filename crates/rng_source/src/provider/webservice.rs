//! Adapter over a native QRNG webservice binding.
//!
//! The binding itself (network protocol, shared library loading) lives
//! outside this crate. It speaks in integer return codes where
//! [`SUCCESS_CODE`] means success and anything else is a failure with no
//! further detail.

use std::fmt;

use super::Provider;
use crate::error::ProviderError;

/// Return code signalling success from the native binding.
pub const SUCCESS_CODE: i32 = 0;

/// Raw operations exposed by a QRNG webservice binding.
pub trait QrngBinding: Send + 'static {
    /// Opens a session with the given credentials.
    fn connect(&mut self, username: &str, password: &str) -> i32;

    /// Fills `out` with random values, returning the code and the number of
    /// values received.
    fn get_double_array(&mut self, out: &mut [f64]) -> (i32, usize);

    /// Closes the session.
    fn disconnect(&mut self) -> i32;
}

impl<B: QrngBinding + ?Sized> QrngBinding for Box<B> {
    fn connect(&mut self, username: &str, password: &str) -> i32 {
        (**self).connect(username, password)
    }

    fn get_double_array(&mut self, out: &mut [f64]) -> (i32, usize) {
        (**self).get_double_array(out)
    }

    fn disconnect(&mut self) -> i32 {
        (**self).disconnect()
    }
}

/// Webservice account credentials.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Account user name.
    pub username: String,
    /// Account password.
    pub password: String,
}

impl Credentials {
    /// Creates credentials from a user name and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Whether both the user name and the password are set.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Provider that downloads blocks through a [`QrngBinding`].
#[derive(Debug)]
pub struct WebserviceProvider<B> {
    binding: B,
    credentials: Credentials,
}

impl<B: QrngBinding> WebserviceProvider<B> {
    /// Wraps `binding`, authenticating with `credentials` on connect.
    pub fn new(binding: B, credentials: Credentials) -> Self {
        Self {
            binding,
            credentials,
        }
    }

    /// Credentials used on connect.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

fn check(code: i32) -> Result<(), ProviderError> {
    if code == SUCCESS_CODE {
        Ok(())
    } else {
        Err(ProviderError::ReturnCode(code))
    }
}

impl<B: QrngBinding> Provider for WebserviceProvider<B> {
    fn connect(&mut self) -> Result<(), ProviderError> {
        check(
            self.binding
                .connect(&self.credentials.username, &self.credentials.password),
        )
    }

    fn fill(&mut self, block: &mut [f64]) -> Result<(), ProviderError> {
        let (code, received) = self.binding.get_double_array(block);
        check(code)?;
        if received < block.len() {
            return Err(ProviderError::ShortFill {
                requested: block.len(),
                received,
            });
        }
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), ProviderError> {
        check(self.binding.disconnect())
    }

    fn description(&self) -> &str {
        "Qrng.physik.hu-berlin webservice"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeBinding {
        connect_code: i32,
        fill_code: i32,
        deliver: Option<usize>,
        last_user: String,
    }

    impl FakeBinding {
        fn ok() -> Self {
            Self {
                connect_code: SUCCESS_CODE,
                fill_code: SUCCESS_CODE,
                deliver: None,
                last_user: String::new(),
            }
        }
    }

    impl QrngBinding for FakeBinding {
        fn connect(&mut self, username: &str, _password: &str) -> i32 {
            self.last_user = username.to_string();
            self.connect_code
        }

        fn get_double_array(&mut self, out: &mut [f64]) -> (i32, usize) {
            let received = self.deliver.unwrap_or(out.len()).min(out.len());
            out[..received].fill(0.75);
            (self.fill_code, received)
        }

        fn disconnect(&mut self) -> i32 {
            SUCCESS_CODE
        }
    }

    #[test]
    fn test_connect_passes_credentials() {
        let mut provider =
            WebserviceProvider::new(FakeBinding::ok(), Credentials::new("alice", "secret"));
        assert!(provider.connect().is_ok());
        assert_eq!(provider.binding.last_user, "alice");
    }

    #[test]
    fn test_non_zero_code_is_failure() {
        let mut binding = FakeBinding::ok();
        binding.connect_code = 5;
        let mut provider = WebserviceProvider::new(binding, Credentials::default());
        assert_eq!(provider.connect(), Err(ProviderError::ReturnCode(5)));
    }

    #[test]
    fn test_fill_success_and_short_fill() {
        let mut provider = WebserviceProvider::new(FakeBinding::ok(), Credentials::default());
        let mut block = [0.0; 4];
        assert!(provider.fill(&mut block).is_ok());
        assert_eq!(block, [0.75; 4]);

        provider.binding.deliver = Some(2);
        assert_eq!(
            provider.fill(&mut block),
            Err(ProviderError::ShortFill {
                requested: 4,
                received: 2
            })
        );
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials::new("bob", "hunter2");
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("bob"));
        assert!(!rendered.contains("hunter2"));
        assert!(credentials.is_complete());
        assert!(!Credentials::new("bob", "").is_complete());
    }
}
