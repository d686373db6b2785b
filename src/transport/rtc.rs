//! WebRTC data channel link
//!
//! Wraps a `webrtc` peer connection with one ordered, reliable data channel.
//! Callbacks from the peer connection only forward [`LinkEvent`]s onto the
//! endpoint's event channel.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use webrtc::api::APIBuilder;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

use super::{
    IceCandidate, LinkEvent, PeerEndpoint, PeerLink, SdpKind, SessionDescription, TransportError,
};

/// Label of the game data channel
pub const CHANNEL_LABEL: &str = "wordle";

type ChannelSlot = Arc<Mutex<Option<Arc<RTCDataChannel>>>>;

/// Peer link backed by a WebRTC peer connection
pub struct RtcLink {
    peer: Arc<RTCPeerConnection>,
    channel: ChannelSlot,
    events: mpsc::UnboundedSender<LinkEvent>,
}

impl RtcLink {
    /// Create a peer connection using the given STUN/TURN urls.
    ///
    /// # Errors
    /// Returns `TransportError::Rtc` if the peer connection cannot be created.
    pub async fn connect(ice_servers: &[String]) -> Result<PeerEndpoint, TransportError> {
        let api = APIBuilder::new().build();
        let servers = if ice_servers.is_empty() {
            Vec::new()
        } else {
            vec![RTCIceServer {
                urls: ice_servers.to_vec(),
                ..Default::default()
            }]
        };
        let config = RTCConfiguration {
            ice_servers: servers,
            ..Default::default()
        };
        let peer = Arc::new(api.new_peer_connection(config).await?);
        let (events, rx) = mpsc::unbounded_channel();
        let channel: ChannelSlot = Arc::new(Mutex::new(None));

        let tx = events.clone();
        peer.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            let tx = tx.clone();
            Box::pin(async move {
                // None marks the end of gathering
                let Some(candidate) = candidate else { return };
                match candidate.to_json() {
                    Ok(init) => {
                        let _ = tx.send(LinkEvent::LocalCandidate(from_init(init)));
                    }
                    Err(e) => log::warn!("Failed to serialize local candidate: {e}"),
                }
            })
        }));

        let tx = events.clone();
        let slot = channel.clone();
        peer.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let tx = tx.clone();
            let slot = slot.clone();
            Box::pin(async move {
                log::debug!("Inbound data channel '{}'", dc.label());
                wire_channel(&dc, &tx, false);
                store_channel(&slot, dc);
            })
        }));

        let link = Arc::new(Self {
            peer,
            channel,
            events,
        });
        Ok(PeerEndpoint { link, events: rx })
    }

    fn current_channel(&self) -> Option<Arc<RTCDataChannel>> {
        self.channel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn store_channel(slot: &ChannelSlot, dc: Arc<RTCDataChannel>) {
    *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(dc);
}

fn wire_channel(dc: &Arc<RTCDataChannel>, tx: &mpsc::UnboundedSender<LinkEvent>, initiated: bool) {
    let open_tx = tx.clone();
    dc.on_open(Box::new(move || {
        let tx = open_tx.clone();
        Box::pin(async move {
            let _ = tx.send(LinkEvent::ChannelOpen { initiated });
        })
    }));

    let msg_tx = tx.clone();
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let tx = msg_tx.clone();
        Box::pin(async move {
            match String::from_utf8(msg.data.to_vec()) {
                Ok(text) => {
                    let _ = tx.send(LinkEvent::Message(text));
                }
                Err(_) => log::warn!("Dropping non UTF-8 data channel message"),
            }
        })
    }));

    let close_tx = tx.clone();
    dc.on_close(Box::new(move || {
        let tx = close_tx.clone();
        Box::pin(async move {
            let _ = tx.send(LinkEvent::ChannelClosed);
        })
    }));
}

fn from_init(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_mline_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}

fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription, TransportError> {
    let rtc = match desc.kind {
        SdpKind::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpKind::Answer => RTCSessionDescription::answer(desc.sdp)?,
    };
    Ok(rtc)
}

fn from_rtc(desc: RTCSessionDescription) -> Result<SessionDescription, TransportError> {
    let kind = match desc.sdp_type {
        RTCSdpType::Offer => SdpKind::Offer,
        RTCSdpType::Answer => SdpKind::Answer,
        other => {
            return Err(TransportError::Negotiation(format!(
                "unsupported description type {other}"
            )));
        }
    };
    Ok(SessionDescription {
        kind,
        sdp: desc.sdp,
    })
}

#[async_trait]
impl PeerLink for RtcLink {
    async fn open_channel(&self) -> Result<(), TransportError> {
        let dc = self.peer.create_data_channel(CHANNEL_LABEL, None).await?;
        wire_channel(&dc, &self.events, true);
        store_channel(&self.channel, dc);
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, TransportError> {
        from_rtc(self.peer.create_offer(None).await?)
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        from_rtc(self.peer.create_answer(None).await?)
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), TransportError> {
        self.peer.set_local_description(to_rtc(desc)?).await?;
        Ok(())
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), TransportError> {
        self.peer.set_remote_description(to_rtc(desc)?).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_mline_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn send(&self, text: String) -> Result<(), TransportError> {
        let dc = self
            .current_channel()
            .ok_or(TransportError::ChannelNotOpen)?;
        if dc.ready_state() != RTCDataChannelState::Open {
            return Err(TransportError::ChannelNotOpen);
        }
        dc.send_text(text).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.peer.close().await?;
        Ok(())
    }
}
