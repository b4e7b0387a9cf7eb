use crate::config::RoomConfig;
use crate::error::RoomError;
use crate::media::{MediaSource, MediaStreamRegistry, MediaTrack};
use crate::negotiator::{RecoveryAction, SessionNegotiator};
use crate::peer::{PeerEvent, PeerSessionFactory};
use crate::room::{ParticipantDirectory, RoomCommand, RoomEvent, RoomHandle};
use crate::signaling::{ClosureKind, SignalEvent, SignalingAdapter, SocketConnector};
use dashmap::DashMap;
use huddle_core::{
    ChatKind, ChatMessage, JoinData, LeaveData, Participant, ParticipantAction, ParticipantId,
    ParticipantUpdate, RoomId, SignalMessage,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Owns all mutable room state and processes every stimulus on a
/// single event loop, one at a time: public commands, signaling
/// traffic, peer session events, and its own timers. Nothing outside
/// this loop mutates negotiators, the directory, or local media state.
pub struct RoomSessionController {
    config: RoomConfig,
    connector: Arc<dyn SocketConnector>,
    factory: Arc<dyn PeerSessionFactory>,
    local: JoinData,

    room_id: Option<RoomId>,
    adapter: Option<SignalingAdapter>,
    registry: MediaStreamRegistry,
    directory: ParticipantDirectory,
    negotiators: HashMap<ParticipantId, SessionNegotiator>,
    retry_timers: HashMap<ParticipantId, JoinHandle<()>>,

    command_tx: mpsc::Sender<RoomCommand>,
    command_rx: mpsc::Receiver<RoomCommand>,
    events_tx: mpsc::Sender<RoomEvent>,
    signal_tx: mpsc::Sender<SignalEvent>,
    signal_rx: mpsc::Receiver<SignalEvent>,
    peer_tx: mpsc::Sender<PeerEvent>,
    peer_rx: mpsc::Receiver<PeerEvent>,
}

impl RoomSessionController {
    pub fn new(
        config: RoomConfig,
        connector: Arc<dyn SocketConnector>,
        factory: Arc<dyn PeerSessionFactory>,
        source: Arc<dyn MediaSource>,
        local: JoinData,
    ) -> (Self, RoomHandle, mpsc::Receiver<RoomEvent>) {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (events_tx, events_rx) = mpsc::channel(64);
        let (signal_tx, signal_rx) = mpsc::channel(256);
        let (peer_tx, peer_rx) = mpsc::channel(256);

        let remote_streams = Arc::new(DashMap::new());
        let registry = MediaStreamRegistry::new(source, remote_streams.clone());
        let handle = RoomHandle::new(command_tx.clone(), remote_streams);

        let controller = Self {
            config,
            connector,
            factory,
            local,
            room_id: None,
            adapter: None,
            registry,
            directory: ParticipantDirectory::new(),
            negotiators: HashMap::new(),
            retry_timers: HashMap::new(),
            command_tx,
            command_rx,
            events_tx,
            signal_tx,
            signal_rx,
            peer_tx,
            peer_rx,
        };
        (controller, handle, events_rx)
    }

    /// Build a controller and run it on a fresh task.
    pub fn spawn(
        config: RoomConfig,
        connector: Arc<dyn SocketConnector>,
        factory: Arc<dyn PeerSessionFactory>,
        source: Arc<dyn MediaSource>,
        local: JoinData,
    ) -> (RoomHandle, mpsc::Receiver<RoomEvent>) {
        let (controller, handle, events_rx) = Self::new(config, connector, factory, source, local);
        tokio::spawn(controller.run());
        (handle, events_rx)
    }

    pub async fn run(mut self) {
        info!(local_id = %self.local.user_id, "Room session loop started");

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(RoomCommand::Shutdown) | None => {
                            self.do_leave().await;
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                    }
                }

                Some(event) = self.signal_rx.recv() => {
                    self.handle_signal(event).await;
                }

                Some(event) = self.peer_rx.recv() => {
                    self.handle_peer_event(event).await;
                }
            }
        }

        info!("Room session loop stopped");
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { room_id, reply } => {
                let result = self.do_join(room_id).await;
                let _ = reply.send(result);
            }
            RoomCommand::Leave { reply } => {
                self.do_leave().await;
                let _ = reply.send(Ok(()));
            }
            RoomCommand::ToggleMute { reply } => {
                let _ = reply.send(self.registry.toggle_mute());
            }
            RoomCommand::ToggleVideo { reply } => {
                let _ = reply.send(self.registry.toggle_video());
            }
            RoomCommand::StartScreenShare { reply } => {
                let _ = reply.send(self.do_start_screen_share().await);
            }
            RoomCommand::StopScreenShare { reply } => {
                let _ = reply.send(self.do_stop_screen_share().await);
            }
            RoomCommand::SendChat { content } => {
                self.do_send_chat(content).await;
            }
            RoomCommand::RetryNegotiation {
                participant_id,
                ice_restart,
            } => {
                self.retry_negotiation(participant_id, ice_restart).await;
            }
            RoomCommand::ScreenShareEnded => {
                if self.registry.is_screen_sharing() {
                    info!("Screen capture ended by its source, restoring camera");
                    if let Err(e) = self.do_stop_screen_share().await {
                        warn!("Failed to restore camera after screen share ended: {}", e);
                    }
                }
            }
            // Handled by the run loop before delegation.
            RoomCommand::Shutdown => {}
        }
    }

    async fn do_join(&mut self, room_id: RoomId) -> Result<(), RoomError> {
        if let Some(current) = &self.room_id {
            if *current == room_id {
                debug!(%room_id, "Join ignored, already a member");
                return Ok(());
            }
            return Err(RoomError::AlreadyJoined(current.clone()));
        }

        // The only capture fault the caller sees: no local media, no
        // room entry.
        self.registry.initialize_local().await?;

        let mut adapter = SignalingAdapter::new(
            self.connector.clone(),
            self.config.clone(),
            room_id.clone(),
            self.local.clone(),
            self.signal_tx.clone(),
        );
        adapter.connect().await?;

        self.adapter = Some(adapter);
        self.room_id = Some(room_id.clone());
        info!(%room_id, "Joined room");
        self.emit(RoomEvent::Joined { room_id }).await;
        Ok(())
    }

    async fn do_leave(&mut self) {
        let Some(room_id) = self.room_id.take() else {
            debug!("Leave ignored, not a member of any room");
            return;
        };

        if let Some(adapter) = self.adapter.as_mut() {
            let notice = SignalMessage::Leave {
                room_id: room_id.clone(),
                data: LeaveData {
                    user_id: self.local.user_id.clone(),
                },
            };
            // Best effort; leaving must not block on delivery.
            let _ = adapter.send_once(&notice).await;
        }

        let ids: Vec<ParticipantId> = self.negotiators.keys().cloned().collect();
        for id in ids {
            self.destroy_negotiator(&id).await;
        }
        for (_, timer) in self.retry_timers.drain() {
            timer.abort();
        }

        if let Some(mut adapter) = self.adapter.take() {
            adapter.close().await;
        }
        self.directory.replace_all(Vec::new());
        self.registry.release_local();

        info!(%room_id, "Left room");
        self.emit(RoomEvent::Left).await;
    }

    async fn do_start_screen_share(&mut self) -> Result<(), RoomError> {
        if self.room_id.is_none() {
            return Err(RoomError::NotJoined);
        }
        if self.registry.is_screen_sharing() {
            return Ok(());
        }

        let screen = self.registry.start_screen_share().await?;

        // Route the capture source ending (user stops via the OS/browser
        // chrome) back through the command queue.
        let command_tx = self.command_tx.clone();
        screen.set_on_ended(Box::new(move || {
            let _ = command_tx.try_send(RoomCommand::ScreenShareEnded);
        }));

        self.substitute_video_track(screen).await;
        self.emit(RoomEvent::ScreenShareChanged { active: true }).await;
        Ok(())
    }

    async fn do_stop_screen_share(&mut self) -> Result<(), RoomError> {
        if !self.registry.is_screen_sharing() {
            return Ok(());
        }

        let camera = self.registry.stop_screen_share().await?;
        self.substitute_video_track(camera).await;
        self.emit(RoomEvent::ScreenShareChanged { active: false }).await;
        Ok(())
    }

    /// Swap the outgoing video track on every live peer session. No
    /// renegotiation; failures are logged per peer and do not stop the
    /// rest.
    async fn substitute_video_track(&self, track: Arc<dyn MediaTrack>) {
        for negotiator in self.negotiators.values() {
            if let Err(e) = negotiator.replace_video_track(track.clone()).await {
                warn!(
                    remote_id = %negotiator.remote_id(),
                    "Video track substitution failed: {}", e
                );
            }
        }
    }

    async fn do_send_chat(&mut self, content: String) {
        let Some(room_id) = self.room_id.clone() else {
            warn!("Chat message dropped, not a member of any room");
            return;
        };

        let message = SignalMessage::Chat {
            room_id,
            data: ChatMessage {
                content,
                sender_id: self.local.user_id.clone(),
                sender_name: self.local.name.clone(),
                kind: ChatKind::Text,
                timestamp: None,
            },
        };
        if let Some(adapter) = self.adapter.as_mut() {
            if !adapter.send(&message).await {
                warn!("Chat message could not be delivered");
            }
        }
    }

    async fn retry_negotiation(&mut self, participant_id: ParticipantId, ice_restart: bool) {
        self.retry_timers.remove(&participant_id);

        if self.adapter.as_ref().is_none_or(|a| a.is_resetting()) {
            debug!(%participant_id, "Negotiation retry skipped, signaling channel resetting");
            return;
        }
        if !self.negotiators.contains_key(&participant_id) {
            return;
        }

        if !ice_restart {
            let negotiator = match self.negotiators.get_mut(&participant_id) {
                Some(n) => n,
                None => return,
            };
            if let Err(e) = negotiator.rebuild_session().await {
                warn!(%participant_id, "Peer session rebuild failed: {}", e);
                self.fail_negotiation(&participant_id).await;
                return;
            }
        }

        let (Some(adapter), Some(negotiator)) = (
            self.adapter.as_mut(),
            self.negotiators.get_mut(&participant_id),
        ) else {
            return;
        };
        if let Err(e) = negotiator
            .start_offer(ice_restart, &self.registry, adapter)
            .await
        {
            warn!(%participant_id, "Negotiation retry failed: {}", e);
            self.fail_negotiation(&participant_id).await;
        }
    }

    async fn handle_signal(&mut self, event: SignalEvent) {
        match event {
            SignalEvent::Message { seq, message } => {
                let current = match self.adapter.as_ref() {
                    Some(adapter) => adapter.current_seq(),
                    None => return,
                };
                if seq != current {
                    debug!("Message from a stale signaling connection dropped");
                    return;
                }
                self.handle_signal_message(message).await;
            }
            SignalEvent::Closed { seq, code } => {
                let Some(adapter) = self.adapter.as_ref() else {
                    return;
                };
                match adapter.classify_closure(seq, code) {
                    ClosureKind::Stale => {}
                    ClosureKind::Normal => {
                        info!("Signaling channel closed normally");
                    }
                    ClosureKind::Abnormal => {
                        warn!(?code, "Signaling channel closed abnormally");
                        self.reset_negotiators().await;
                        if let Some(adapter) = self.adapter.as_mut() {
                            adapter.schedule_reconnect();
                        }
                        self.emit(RoomEvent::SignalingReset).await;
                    }
                }
            }
            SignalEvent::ReconnectDue { seq } => {
                if let Some(adapter) = self.adapter.as_mut() {
                    adapter.reconnect(seq).await;
                }
            }
        }
    }

    async fn handle_signal_message(&mut self, message: SignalMessage) {
        if let Some(room_id) = message.room_id() {
            if Some(room_id) != self.room_id.as_ref() {
                debug!(%room_id, "Message for another room dropped");
                return;
            }
        }

        match message {
            SignalMessage::Offer {
                sender_id: Some(sender),
                data,
                ..
            } => {
                if sender == self.local.user_id {
                    return;
                }
                if !self.ensure_negotiator(&sender).await {
                    return;
                }
                let (Some(adapter), Some(negotiator)) =
                    (self.adapter.as_mut(), self.negotiators.get_mut(&sender))
                else {
                    return;
                };
                if let Err(e) = negotiator.handle_offer(data, &self.registry, adapter).await {
                    warn!(%sender, "Failed to answer offer: {}", e);
                    self.fail_negotiation(&sender).await;
                }
            }
            SignalMessage::Answer {
                sender_id: Some(sender),
                data,
                ..
            } => {
                if sender == self.local.user_id {
                    return;
                }
                let Some(negotiator) = self.negotiators.get_mut(&sender) else {
                    warn!(%sender, "Answer from unknown participant dropped");
                    return;
                };
                if let Err(e) = negotiator.handle_answer(data).await {
                    warn!(%sender, "Failed to apply answer: {}", e);
                    self.fail_negotiation(&sender).await;
                }
            }
            SignalMessage::IceCandidate {
                sender_id: Some(sender),
                data,
                ..
            } => {
                if sender == self.local.user_id {
                    return;
                }
                if !self.ensure_negotiator(&sender).await {
                    return;
                }
                if let Some(negotiator) = self.negotiators.get_mut(&sender) {
                    if let Err(e) = negotiator.handle_candidate(data).await {
                        warn!(%sender, "Failed to take ICE candidate: {}", e);
                    }
                }
            }
            SignalMessage::Offer { sender_id: None, .. }
            | SignalMessage::Answer { sender_id: None, .. }
            | SignalMessage::IceCandidate { sender_id: None, .. } => {
                warn!("Negotiation message without a sender discarded");
            }
            SignalMessage::Participant { data } => {
                self.handle_participant_update(data).await;
            }
            SignalMessage::ParticipantsSnapshot { data } => {
                self.handle_participants_snapshot(data.participants).await;
            }
            SignalMessage::Chat { data, .. } => {
                self.emit(RoomEvent::Chat { message: data }).await;
            }
            SignalMessage::ChatHistory { data } => {
                self.emit(RoomEvent::ChatHistory {
                    messages: data.messages,
                })
                .await;
            }
            // Client-to-server only; a server echoing them is ignored.
            SignalMessage::Join { .. } | SignalMessage::Leave { .. } => {}
        }
    }

    async fn handle_participant_update(&mut self, update: ParticipantUpdate) {
        let ParticipantUpdate {
            user_id, action, name,
        } = update;

        match action {
            ParticipantAction::Joined => {
                self.directory.upsert(Participant {
                    id: user_id.clone(),
                    name: name.unwrap_or_default(),
                });
                info!(%user_id, "Participant joined");

                if user_id != self.local.user_id {
                    // A joined notice for an id we already negotiate
                    // with means that peer rebuilt its session; start
                    // over with a fresh one.
                    if self.negotiators.contains_key(&user_id) {
                        debug!(%user_id, "Participant rejoined, discarding old negotiation");
                        self.destroy_negotiator(&user_id).await;
                    }

                    // The receiving side initiates the offer.
                    if self.ensure_negotiator(&user_id).await {
                        let (Some(adapter), Some(negotiator)) = (
                            self.adapter.as_mut(),
                            self.negotiators.get_mut(&user_id),
                        ) else {
                            return;
                        };
                        if let Err(e) = negotiator
                            .start_offer(false, &self.registry, adapter)
                            .await
                        {
                            warn!(%user_id, "Failed to offer to joined participant: {}", e);
                            self.fail_negotiation(&user_id).await;
                        }
                    }
                }
                self.emit_participants().await;
            }
            ParticipantAction::Left => {
                info!(%user_id, "Participant left");
                self.directory.remove(&user_id);
                self.destroy_negotiator(&user_id).await;
                self.emit_participants().await;
            }
        }
    }

    async fn handle_participants_snapshot(&mut self, participants: Vec<Participant>) {
        let present: std::collections::HashSet<ParticipantId> =
            participants.iter().map(|p| p.id.clone()).collect();

        // Anyone we negotiate with who is absent from the snapshot is
        // gone; the server view wins.
        let stale: Vec<ParticipantId> = self
            .negotiators
            .keys()
            .filter(|id| !present.contains(id))
            .cloned()
            .collect();
        for id in stale {
            debug!(%id, "Participant absent from snapshot, dropping negotiation");
            self.destroy_negotiator(&id).await;
        }

        self.directory.replace_all(participants);
        self.emit_participants().await;
    }

    async fn handle_peer_event(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::CandidateGenerated {
                participant_id,
                candidate,
            } => {
                let Some(room_id) = self.room_id.clone() else {
                    return;
                };
                let message = SignalMessage::IceCandidate {
                    room_id,
                    sender_id: Some(self.local.user_id.clone()),
                    data: candidate,
                };
                if let Some(adapter) = self.adapter.as_mut() {
                    if !adapter.send(&message).await {
                        warn!(%participant_id, "Local ICE candidate could not be delivered");
                    }
                }
            }
            PeerEvent::RemoteStream {
                participant_id,
                stream,
            } => {
                let display_name = self
                    .directory
                    .name_of(&participant_id)
                    .unwrap_or_default()
                    .to_string();
                self.registry
                    .upsert_remote(participant_id.clone(), stream, display_name);
                self.emit(RoomEvent::RemoteStreamAdded { participant_id }).await;
            }
            PeerEvent::ConnectivityChanged {
                participant_id,
                state,
            } => {
                self.emit(RoomEvent::PeerConnectivity {
                    participant_id: participant_id.clone(),
                    state,
                })
                .await;

                let action = match self.negotiators.get_mut(&participant_id) {
                    Some(negotiator) => negotiator.handle_connectivity(state),
                    None => return,
                };
                match action {
                    RecoveryAction::None => {}
                    RecoveryAction::RestartIce => {
                        self.schedule_retry(participant_id, true);
                    }
                    RecoveryAction::Recreate => {
                        self.schedule_retry(participant_id, false);
                    }
                    RecoveryAction::GiveUp => {
                        self.destroy_negotiator(&participant_id).await;
                        if self.directory.remove(&participant_id).is_some() {
                            self.emit_participants().await;
                        }
                    }
                }
            }
        }
    }

    /// Arm (or re-arm) the per-peer recovery timer. The delay grows
    /// linearly with the attempt count.
    fn schedule_retry(&mut self, participant_id: ParticipantId, ice_restart: bool) {
        let attempts = self
            .negotiators
            .get(&participant_id)
            .map(|n| n.recovery_attempts())
            .unwrap_or(1)
            .max(1);
        let delay = self.config.negotiation_retry_delay * attempts;

        if let Some(old) = self.retry_timers.remove(&participant_id) {
            old.abort();
        }
        debug!(%participant_id, ?delay, ice_restart, "Negotiation retry scheduled");

        let command_tx = self.command_tx.clone();
        let id = participant_id.clone();
        self.retry_timers.insert(
            participant_id,
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = command_tx
                    .send(RoomCommand::RetryNegotiation {
                        participant_id: id,
                        ice_restart,
                    })
                    .await;
            }),
        );
    }

    /// Create a negotiator for a participant we have none for yet.
    /// Used both for the proactive offer on join and lazily when an
    /// offer or candidate arrives from an unseen sender.
    async fn ensure_negotiator(&mut self, participant_id: &ParticipantId) -> bool {
        if self.negotiators.contains_key(participant_id) {
            return true;
        }
        let Some(room_id) = self.room_id.clone() else {
            return false;
        };

        match SessionNegotiator::connect(
            room_id,
            self.local.user_id.clone(),
            participant_id.clone(),
            self.factory.clone(),
            self.peer_tx.clone(),
            self.config.candidate_buffer_capacity,
            self.config.max_recovery_attempts,
        )
        .await
        {
            Ok(negotiator) => {
                self.negotiators.insert(participant_id.clone(), negotiator);
                true
            }
            Err(e) => {
                warn!(%participant_id, "Failed to create session negotiator: {}", e);
                false
            }
        }
    }

    /// Negotiation errors never propagate: log at the call site, then
    /// route the peer through the bounded recovery ladder. The next
    /// retry rebuilds the session from scratch; once the budget is
    /// spent the peer is dropped from the room entirely.
    async fn fail_negotiation(&mut self, participant_id: &ParticipantId) {
        let budget_left = match self.negotiators.get_mut(participant_id) {
            Some(negotiator) => negotiator.begin_recovery(),
            None => return,
        };
        if budget_left {
            self.schedule_retry(participant_id.clone(), false);
        } else {
            self.destroy_negotiator(participant_id).await;
            if self.directory.remove(participant_id).is_some() {
                self.emit_participants().await;
            }
        }
    }

    async fn destroy_negotiator(&mut self, participant_id: &ParticipantId) {
        if let Some(timer) = self.retry_timers.remove(participant_id) {
            timer.abort();
        }
        if let Some(mut negotiator) = self.negotiators.remove(participant_id) {
            negotiator.close().await;
            self.registry.remove_remote(participant_id);
            self.emit(RoomEvent::RemoteStreamRemoved {
                participant_id: participant_id.clone(),
            })
            .await;
        }
    }

    /// Tear down every negotiation after an abnormal channel closure.
    /// The directory is kept; the post-reconnect snapshot reconciles
    /// it, and the join notices re-trigger offers.
    async fn reset_negotiators(&mut self) {
        let ids: Vec<ParticipantId> = self.negotiators.keys().cloned().collect();
        if !ids.is_empty() {
            info!(count = ids.len(), "Resetting all session negotiators");
        }
        for id in ids {
            self.destroy_negotiator(&id).await;
        }
    }

    async fn emit_participants(&mut self) {
        self.emit(RoomEvent::ParticipantsChanged {
            participants: self.directory.list(),
        })
        .await;
    }

    async fn emit(&self, event: RoomEvent) {
        // A dropped event receiver must not stop the loop.
        let _ = self.events_tx.send(event).await;
    }
}
