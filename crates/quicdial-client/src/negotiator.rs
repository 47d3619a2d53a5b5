//! Version negotiation decisions.
//!
//! The server either accepts the offered version implicitly, by answering
//! with ordinary packets, or sends a list of the versions it would accept
//! instead. Only one such list is ever acted on: once a list was honored or
//! the version was accepted, any further list is a replay or a reordered
//! duplicate and could be used to force a downgrade.

use quicdial_session::NegotiationHistory;
use quicdial_types::{choose_supported_version, SupportedVersions, VersionNumber};
use tokio::sync::watch;
use tracing::debug;

use crate::error::PacketError;

/// What to do about a version negotiation packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationOutcome {
    /// The offer lists the version already in use; nothing changes.
    Ignored,
    /// Restart the session with this version.
    Switch(VersionNumber),
    /// Nothing in the offer is acceptable; the connection cannot proceed.
    NoCommonVersion,
}

/// Negotiation state of one connection.
#[derive(Debug)]
pub struct VersionNegotiator {
    initial_version: VersionNumber,
    received_offer: bool,
    negotiated: watch::Sender<bool>,
    history: Option<NegotiationHistory>,
}

impl VersionNegotiator {
    pub fn new(initial_version: VersionNumber) -> Self {
        let (negotiated, _) = watch::channel(false);
        Self {
            initial_version,
            received_offer: false,
            negotiated,
            history: None,
        }
    }

    /// The version the connection started with.
    #[must_use]
    pub fn initial_version(&self) -> VersionNumber {
        self.initial_version
    }

    #[must_use]
    pub fn is_negotiated(&self) -> bool {
        *self.negotiated.borrow()
    }

    /// Observe the completion signal. It flips to `true` once and stays.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.negotiated.subscribe()
    }

    /// The offer that was honored, if any.
    #[must_use]
    pub fn history(&self) -> Option<&NegotiationHistory> {
        self.history.as_ref()
    }

    /// Record that the server answered without a version list. Returns
    /// whether this call completed negotiation.
    pub fn accept_implicitly(&self) -> bool {
        self.negotiated.send_if_modified(|negotiated| {
            if *negotiated {
                return false;
            }
            *negotiated = true;
            true
        })
    }

    /// Decide on an offer while speaking `current`.
    ///
    /// The chosen version is the first of `preferred` that is both supported
    /// and offered.
    pub fn on_offer(
        &mut self,
        current: VersionNumber,
        offered: &[VersionNumber],
        preferred: &[VersionNumber],
        supported: &SupportedVersions,
    ) -> Result<NegotiationOutcome, PacketError> {
        if self.received_offer || self.is_negotiated() {
            return Err(PacketError::DelayedNegotiationPacket);
        }
        if offered.contains(&current) {
            debug!(version = %current, "offer contains the current version, ignoring");
            return Ok(NegotiationOutcome::Ignored);
        }

        self.received_offer = true;
        let usable: Vec<VersionNumber> = preferred
            .iter()
            .copied()
            .filter(|v| supported.contains(*v))
            .collect();
        let Some(version) = choose_supported_version(&usable, offered) else {
            debug!(?offered, "no common version");
            return Ok(NegotiationOutcome::NoCommonVersion);
        };

        self.history = Some(NegotiationHistory {
            initial_version: self.initial_version,
            negotiated_versions: offered.to_vec(),
        });
        Ok(NegotiationOutcome::Switch(version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supported() -> SupportedVersions {
        SupportedVersions::new(vec![
            VersionNumber::GQUIC_43,
            VersionNumber::GQUIC_39,
            VersionNumber(1234),
            VersionNumber(4321),
            VersionNumber(77),
            VersionNumber(78),
        ])
    }

    #[test]
    fn implicit_acceptance_fires_once() {
        let negotiator = VersionNegotiator::new(VersionNumber::GQUIC_43);
        let signal = negotiator.subscribe();
        assert!(!*signal.borrow());

        assert!(negotiator.accept_implicitly());
        assert!(!negotiator.accept_implicitly());
        assert!(negotiator.is_negotiated());
        assert!(*signal.borrow());
    }

    #[test]
    fn picks_first_preferred_version_in_offer() {
        let mut negotiator = VersionNegotiator::new(VersionNumber::GQUIC_43);
        let outcome = negotiator
            .on_offer(
                VersionNumber::GQUIC_43,
                &[VersionNumber(4321), VersionNumber(1234)],
                &[VersionNumber(1234), VersionNumber(4321)],
                &supported(),
            )
            .unwrap();
        assert_eq!(outcome, NegotiationOutcome::Switch(VersionNumber(1234)));

        let history = negotiator.history().unwrap();
        assert_eq!(history.initial_version, VersionNumber::GQUIC_43);
        assert!(history.negotiated_versions.contains(&VersionNumber(1234)));
    }

    #[test]
    fn preferred_but_unsupported_is_skipped() {
        let mut negotiator = VersionNegotiator::new(VersionNumber::GQUIC_43);
        let outcome = negotiator
            .on_offer(
                VersionNumber::GQUIC_43,
                &[VersionNumber(5), VersionNumber(77)],
                &[VersionNumber(5), VersionNumber(77)],
                &supported(),
            )
            .unwrap();
        assert_eq!(outcome, NegotiationOutcome::Switch(VersionNumber(77)));
    }

    #[test]
    fn offer_with_current_version_is_ignored() {
        let mut negotiator = VersionNegotiator::new(VersionNumber::GQUIC_43);
        let outcome = negotiator
            .on_offer(
                VersionNumber::GQUIC_43,
                &[VersionNumber::GQUIC_43],
                supported().as_slice(),
                &supported(),
            )
            .unwrap();
        assert_eq!(outcome, NegotiationOutcome::Ignored);
        assert!(negotiator.history().is_none());

        // Ignoring does not use up the one honored offer.
        let outcome = negotiator
            .on_offer(
                VersionNumber::GQUIC_43,
                &[VersionNumber::GQUIC_39],
                supported().as_slice(),
                &supported(),
            )
            .unwrap();
        assert_eq!(outcome, NegotiationOutcome::Switch(VersionNumber::GQUIC_39));
    }

    #[test]
    fn no_overlap() {
        let mut negotiator = VersionNegotiator::new(VersionNumber::GQUIC_43);
        let outcome = negotiator
            .on_offer(
                VersionNumber::GQUIC_43,
                &[VersionNumber(1)],
                supported().as_slice(),
                &supported(),
            )
            .unwrap();
        assert_eq!(outcome, NegotiationOutcome::NoCommonVersion);
    }

    #[test]
    fn second_offer_is_delayed() {
        let mut negotiator = VersionNegotiator::new(VersionNumber::GQUIC_43);
        let preferred = [VersionNumber(77), VersionNumber(78)];
        negotiator
            .on_offer(VersionNumber::GQUIC_43, &[VersionNumber(77)], &preferred, &supported())
            .unwrap();
        let err = negotiator
            .on_offer(VersionNumber(77), &[VersionNumber(78)], &preferred, &supported())
            .unwrap_err();
        assert!(matches!(err, PacketError::DelayedNegotiationPacket));
    }

    #[test]
    fn offer_after_acceptance_is_delayed() {
        let mut negotiator = VersionNegotiator::new(VersionNumber::GQUIC_43);
        negotiator.accept_implicitly();
        let err = negotiator
            .on_offer(
                VersionNumber::GQUIC_43,
                &[VersionNumber::GQUIC_39],
                supported().as_slice(),
                &supported(),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "received a delayed version negotiation packet");
    }
}
