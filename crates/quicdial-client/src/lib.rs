//! Client connection establishment for quicdial.
//!
//! Takes a transport and a remote address to a running session: validates
//! every incoming datagram, negotiates the protocol version with
//! downgrade protection, and replaces the session backend when the version
//! changes or the server asks for a retry.

pub mod config;
pub mod connection;
pub mod dialer;
pub mod error;
pub mod negotiator;
pub mod reset;
pub mod setup;
pub mod tls;
pub mod validator;

pub use config::ClientConfig;
pub use connection::ClientConnection;
pub use dialer::{Dialer, SessionHandle};
pub use error::{ClientError, PacketError};
pub use negotiator::{NegotiationOutcome, VersionNegotiator};
pub use setup::{load_config, load_config_from};
pub use tls::{client_config_from_pem, client_config_skip_verification, ALPN_PROTOCOL};
pub use validator::{validate, Validated, ValidationContext};
