//! In-process peer link pair
//!
//! Reproduces the shape of a real handshake without any network: each side
//! must hold a local and a remote description and have received at least one
//! candidate from the other before the data channel opens. Messages are
//! delivered in send order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    IceCandidate, LinkEvent, PeerEndpoint, PeerLink, SdpKind, SessionDescription, TransportError,
};

struct Side {
    local: Option<SessionDescription>,
    remote: Option<SessionDescription>,
    candidates: usize,
    initiated: bool,
    events: mpsc::UnboundedSender<LinkEvent>,
}

impl Side {
    fn new(events: mpsc::UnboundedSender<LinkEvent>) -> Self {
        Self {
            local: None,
            remote: None,
            candidates: 0,
            initiated: false,
            events,
        }
    }

    fn negotiated(&self) -> bool {
        self.local.is_some() && self.remote.is_some() && self.candidates > 0
    }
}

struct Fabric {
    sides: [Side; 2],
    drop_candidates: bool,
    open: bool,
    closed: bool,
}

impl Fabric {
    fn try_open(&mut self) {
        if self.open || self.closed {
            return;
        }
        let requested = self.sides.iter().any(|s| s.initiated);
        if requested && self.sides.iter().all(Side::negotiated) {
            self.open = true;
            for side in &self.sides {
                let _ = side.events.send(LinkEvent::ChannelOpen {
                    initiated: side.initiated,
                });
            }
        }
    }
}

/// One end of an in-process link pair
pub struct LoopbackLink {
    index: usize,
    fabric: Arc<Mutex<Fabric>>,
}

impl LoopbackLink {
    /// Create two linked endpoints
    #[must_use]
    pub fn pair() -> (PeerEndpoint, PeerEndpoint) {
        Self::build(false)
    }

    /// Create two endpoints whose candidates never arrive
    ///
    /// Negotiation on this pair never completes.
    #[must_use]
    pub fn pair_dropping_candidates() -> (PeerEndpoint, PeerEndpoint) {
        Self::build(true)
    }

    fn build(drop_candidates: bool) -> (PeerEndpoint, PeerEndpoint) {
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();
        let fabric = Arc::new(Mutex::new(Fabric {
            sides: [Side::new(tx_a), Side::new(tx_b)],
            drop_candidates,
            open: false,
            closed: false,
        }));

        let a = PeerEndpoint {
            link: Arc::new(Self {
                index: 0,
                fabric: fabric.clone(),
            }),
            events: rx_a,
        };
        let b = PeerEndpoint {
            link: Arc::new(Self { index: 1, fabric }),
            events: rx_b,
        };
        (a, b)
    }

    fn fabric(&self) -> MutexGuard<'_, Fabric> {
        self.fabric.lock().unwrap_or_else(PoisonError::into_inner)
    }

    const fn peer(&self) -> usize {
        1 - self.index
    }

    fn description(&self, kind: SdpKind) -> SessionDescription {
        SessionDescription {
            kind,
            sdp: format!("v=0\r\no=loopback {} 0 IN IP4 127.0.0.1\r\n", self.index),
        }
    }
}

#[async_trait]
impl PeerLink for LoopbackLink {
    async fn open_channel(&self) -> Result<(), TransportError> {
        let mut fabric = self.fabric();
        fabric.sides[self.index].initiated = true;
        fabric.try_open();
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, TransportError> {
        Ok(self.description(SdpKind::Offer))
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        let fabric = self.fabric();
        match &fabric.sides[self.index].remote {
            Some(remote) if remote.kind == SdpKind::Offer => Ok(self.description(SdpKind::Answer)),
            _ => Err(TransportError::Negotiation(
                "cannot answer without a remote offer".to_string(),
            )),
        }
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), TransportError> {
        let mut fabric = self.fabric();
        if fabric.closed {
            return Err(TransportError::Closed);
        }
        let side = &mut fabric.sides[self.index];
        side.local = Some(desc);

        // Gathering starts once a local description exists
        let candidate = IceCandidate {
            candidate: format!(
                "candidate:{} 1 udp 2130706431 127.0.0.1 {} typ host",
                self.index,
                50_000 + self.index
            ),
            sdp_mid: Some("0".to_string()),
            sdp_mline_index: Some(0),
            username_fragment: None,
        };
        let _ = side.events.send(LinkEvent::LocalCandidate(candidate));
        fabric.try_open();
        Ok(())
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), TransportError> {
        let mut fabric = self.fabric();
        if fabric.closed {
            return Err(TransportError::Closed);
        }
        fabric.sides[self.index].remote = Some(desc);
        fabric.try_open();
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError> {
        let mut fabric = self.fabric();
        if fabric.closed {
            return Err(TransportError::Closed);
        }
        if fabric.drop_candidates {
            log::debug!("Loopback dropping candidate {}", candidate.candidate);
            return Ok(());
        }
        fabric.sides[self.index].candidates += 1;
        fabric.try_open();
        Ok(())
    }

    async fn send(&self, text: String) -> Result<(), TransportError> {
        let fabric = self.fabric();
        if fabric.closed {
            return Err(TransportError::Closed);
        }
        if !fabric.open {
            return Err(TransportError::ChannelNotOpen);
        }
        fabric.sides[self.peer()]
            .events
            .send(LinkEvent::Message(text))
            .map_err(|_| TransportError::Closed)
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut fabric = self.fabric();
        if fabric.closed {
            return Ok(());
        }
        fabric.closed = true;
        fabric.open = false;
        for side in &fabric.sides {
            let _ = side.events.send(LinkEvent::ChannelClosed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn handshake(a: &PeerEndpoint, b: &PeerEndpoint) {
        a.link.open_channel().await.unwrap();
        let offer = a.link.create_offer().await.unwrap();
        a.link.set_local_description(offer.clone()).await.unwrap();
        b.link.set_remote_description(offer).await.unwrap();
        let answer = b.link.create_answer().await.unwrap();
        b.link.set_local_description(answer.clone()).await.unwrap();
        a.link.set_remote_description(answer).await.unwrap();
    }

    fn next_candidate(events: &mut mpsc::UnboundedReceiver<LinkEvent>) -> IceCandidate {
        match events.try_recv().unwrap() {
            LinkEvent::LocalCandidate(c) => c,
            other => panic!("expected candidate, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn channel_opens_after_full_exchange() {
        let (mut a, mut b) = LoopbackLink::pair();
        handshake(&a, &b).await;

        let cand_a = next_candidate(&mut a.events);
        let cand_b = next_candidate(&mut b.events);
        b.link.add_ice_candidate(cand_a).await.unwrap();
        assert!(a.events.try_recv().is_err());
        a.link.add_ice_candidate(cand_b).await.unwrap();

        assert_eq!(
            a.events.try_recv().unwrap(),
            LinkEvent::ChannelOpen { initiated: true }
        );
        assert_eq!(
            b.events.try_recv().unwrap(),
            LinkEvent::ChannelOpen { initiated: false }
        );

        a.link.send("one".into()).await.unwrap();
        a.link.send("two".into()).await.unwrap();
        assert_eq!(b.events.try_recv().unwrap(), LinkEvent::Message("one".into()));
        assert_eq!(b.events.try_recv().unwrap(), LinkEvent::Message("two".into()));
    }

    #[tokio::test]
    async fn send_before_open_fails() {
        let (a, _b) = LoopbackLink::pair();
        assert!(matches!(
            a.link.send("early".into()).await,
            Err(TransportError::ChannelNotOpen)
        ));
    }

    #[tokio::test]
    async fn answer_requires_offer() {
        let (_a, b) = LoopbackLink::pair();
        assert!(matches!(
            b.link.create_answer().await,
            Err(TransportError::Negotiation(_))
        ));
    }

    #[tokio::test]
    async fn dropped_candidates_never_open() {
        let (mut a, mut b) = LoopbackLink::pair_dropping_candidates();
        handshake(&a, &b).await;
        let cand_a = next_candidate(&mut a.events);
        let cand_b = next_candidate(&mut b.events);
        b.link.add_ice_candidate(cand_a).await.unwrap();
        a.link.add_ice_candidate(cand_b).await.unwrap();

        assert!(a.events.try_recv().is_err());
        assert!(b.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn close_notifies_both_sides() {
        let (mut a, mut b) = LoopbackLink::pair();
        a.link.close().await.unwrap();
        assert_eq!(a.events.try_recv().unwrap(), LinkEvent::ChannelClosed);
        assert_eq!(b.events.try_recv().unwrap(), LinkEvent::ChannelClosed);
        assert!(matches!(
            b.link.send("late".into()).await,
            Err(TransportError::Closed)
        ));
    }
}
