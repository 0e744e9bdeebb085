//! Providers of freshly generated random blocks.
//!
//! A [`Provider`] is the external collaborator that produces raw values in
//! bulk. Sources only need three operations from it: connect, fill a block,
//! disconnect. Any failure means "this block is unavailable now"; retrying is
//! not the provider's job.
//!
//! Variants:
//!
//! - [`PrngProvider`]: seeded pseudo-random generator, reproducible
//! - [`WebserviceProvider`]: adapter over a native QRNG webservice binding

mod prng;
mod webservice;

pub use prng::PrngProvider;
pub use webservice::{Credentials, QrngBinding, WebserviceProvider, SUCCESS_CODE};

use tracing::{info, warn};

use crate::error::ProviderError;

/// Capability that fills blocks with fresh random values.
///
/// Implementations are moved onto the background loader thread, hence the
/// `Send + 'static` bound.
pub trait Provider: Send + 'static {
    /// Opens the connection to the backend.
    fn connect(&mut self) -> Result<(), ProviderError>;

    /// Fills the whole of `block` with fresh values.
    ///
    /// On failure the contents of `block` are unspecified.
    fn fill(&mut self, block: &mut [f64]) -> Result<(), ProviderError>;

    /// Closes the connection to the backend.
    fn disconnect(&mut self) -> Result<(), ProviderError>;

    /// Human readable name of the backend.
    fn description(&self) -> &str;
}

impl<P: Provider + ?Sized> Provider for Box<P> {
    fn connect(&mut self) -> Result<(), ProviderError> {
        (**self).connect()
    }

    fn fill(&mut self, block: &mut [f64]) -> Result<(), ProviderError> {
        (**self).fill(block)
    }

    fn disconnect(&mut self) -> Result<(), ProviderError> {
        (**self).disconnect()
    }

    fn description(&self) -> &str {
        (**self).description()
    }
}

/// A provider together with its connection flag.
///
/// Connecting while connected is a no-op, filling without a connection
/// fails, and disconnecting only reaches the backend when connected.
#[derive(Debug)]
pub(crate) struct Connection<P> {
    provider: P,
    connected: bool,
}

impl<P: Provider> Connection<P> {
    pub(crate) fn new(provider: P) -> Self {
        Self {
            provider,
            connected: false,
        }
    }

    #[inline]
    pub(crate) fn is_connected(&self) -> bool {
        self.connected
    }

    #[inline]
    pub(crate) fn provider(&self) -> &P {
        &self.provider
    }

    pub(crate) fn connect(&mut self) -> bool {
        if self.connected {
            return true;
        }
        match self.provider.connect() {
            Ok(()) => {
                info!(provider = self.provider.description(), "Provider connected");
                self.connected = true;
            }
            Err(err) => {
                warn!(
                    provider = self.provider.description(),
                    error = %err,
                    "Provider connection failed"
                );
            }
        }
        self.connected
    }

    pub(crate) fn fill(&mut self, block: &mut [f64]) -> Result<(), ProviderError> {
        if !self.connected {
            return Err(ProviderError::NotConnected);
        }
        self.provider.fill(block)
    }

    pub(crate) fn disconnect(&mut self) {
        if self.connected {
            if let Err(err) = self.provider.disconnect() {
                warn!(
                    provider = self.provider.description(),
                    error = %err,
                    "Provider disconnect reported an error"
                );
            } else {
                info!(provider = self.provider.description(), "Provider disconnected");
            }
        }
        self.connected = false;
    }
}
