//! Public reset authentication.
//!
//! A reset carries no cryptographic proof; the only check is that it came
//! from the address the connection talks to.

use std::net::SocketAddr;

use quicdial_wire::PublicReset;
use tracing::debug;

use crate::error::PacketError;

/// Accept a reset `body` received `from`, for a connection with `expected`.
pub fn authenticate(
    expected: SocketAddr,
    from: SocketAddr,
    body: &[u8],
) -> Result<PublicReset, PacketError> {
    if from != expected {
        return Err(PacketError::SpoofedReset { from, expected });
    }
    let reset = PublicReset::parse(body).map_err(PacketError::UnparseableReset)?;
    debug!(
        remote = %from,
        rejected_packet_number = reset.rejected_packet_number,
        "authenticated public reset"
    );
    Ok(reset)
}
