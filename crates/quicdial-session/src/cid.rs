//! Connection ID generation.

use quicdial_types::ConnectionId;
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::SessionError;

/// Length of the connection IDs a client picks.
pub const CLIENT_CONNECTION_ID_LEN: usize = 8;

/// Source of fresh connection IDs.
pub trait ConnectionIdGenerator: Send + Sync + 'static {
    fn generate(&self) -> Result<ConnectionId, SessionError>;
}

/// Random 8-byte IDs from the system CSPRNG.
pub struct RandomConnectionIdGenerator {
    rng: SystemRandom,
}

impl RandomConnectionIdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }
}

impl Default for RandomConnectionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionIdGenerator for RandomConnectionIdGenerator {
    fn generate(&self) -> Result<ConnectionId, SessionError> {
        let mut bytes = [0u8; CLIENT_CONNECTION_ID_LEN];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| SessionError::ConnectionIdGeneration)?;
        Ok(ConnectionId::from(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_differ() {
        let generator = RandomConnectionIdGenerator::new();
        let a = generator.generate().unwrap();
        let b = generator.generate().unwrap();
        assert_eq!(a.len(), CLIENT_CONNECTION_ID_LEN);
        assert_ne!(a, b);
    }
}
