//! Broker session state machine.
//!
//! ```text
//! Disconnected ──start──▶ Connecting ──CONNACK──▶ Subscribing ──SUBACK──▶ Listening ─┐
//!       │                     │                        │                      ▲      │ PUBLISH
//!       └─────────────────────┴──────── error ─────────┴──────▶ Failed       └──────┘
//! ```
//!
//! A broker may deliver matching PUBLISH packets before it sends the SUBACK.
//! Those are dispatched too: the client acknowledges QoS 1 messages on
//! receipt, so a message skipped here would never be redelivered.
//!
//! [`Session`] is driven by the MQTT event loop but performs no I/O itself, so
//! every transition can be checked by feeding it [`rumqttc::Event`] values.

use rumqttc::{
    ConnAck, ConnectReturnCode, ConnectionError, Event, Outgoing, Packet, Publish, QoS, SubAck,
    SubscribeReasonCode,
};
use responder::BrokerError;

/// Lifecycle state of the bridge's broker session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// No connection attempted yet.
    Disconnected,
    /// Waiting for the CONNACK.
    Connecting,
    /// Connected; waiting for the SUBACK.
    Subscribing,
    /// Subscription confirmed; inbound messages are dispatched.
    Listening,
    /// Terminal. The bridge stops and the process exits.
    Failed,
}

/// The subscription the broker confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantedTopic {
    /// Topic filter the acknowledgment answers.
    pub topic: String,
    /// Delivery quality the broker granted.
    pub qos: QoS,
}

impl GrantedTopic {
    /// `(channel, resource)` when the topic has exactly two segments.
    pub fn segments(&self) -> Option<(&str, &str)> {
        split_topic(&self.topic)
    }
}

/// What the driver must do after an event.
#[derive(Debug)]
pub enum Step {
    /// Nothing.
    Continue,
    /// Connection established: issue the subscribe request.
    Subscribe,
    /// Subscription confirmed.
    Listening(GrantedTopic),
    /// Hand the message to the per-event handler.
    Dispatch(Publish),
}

/// Tracks one broker session from start to `Listening` or `Failed`.
#[derive(Debug)]
pub struct Session {
    state: BridgeState,
    topic: String,
    subscribe_pkid: Option<u16>,
}

impl Session {
    /// Creates a session that will subscribe to `topic`.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            state: BridgeState::Disconnected,
            topic: topic.into(),
            subscribe_pkid: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// `true` once the broker has accepted the connection and before failure.
    pub fn is_connected(&self) -> bool {
        matches!(
            self.state,
            BridgeState::Subscribing | BridgeState::Listening
        )
    }

    /// Topic filter this session subscribes to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// `Disconnected -> Connecting`.
    pub fn start(&mut self) {
        if self.state == BridgeState::Disconnected {
            self.state = BridgeState::Connecting;
        }
    }

    /// Moves to `Failed` and hands the error back for propagation.
    pub fn fail(&mut self, error: BrokerError) -> BrokerError {
        self.state = BridgeState::Failed;
        error
    }

    /// Records a transport error reported by the event loop.
    pub fn connection_failed(&mut self, error: &ConnectionError) -> BrokerError {
        let error = match error {
            ConnectionError::ConnectionRefused(code) => BrokerError::Refused(format!("{code:?}")),
            other => BrokerError::Connection(other.to_string()),
        };
        self.fail(error)
    }

    /// Advances the state machine with one event-loop event.
    ///
    /// # Errors
    ///
    /// Returns a [`BrokerError`] (and enters `Failed`) when the broker refuses
    /// the connection or the subscription acknowledgment is malformed or empty.
    pub fn on_event(&mut self, event: Event) -> Result<Step, BrokerError> {
        if self.state == BridgeState::Failed {
            return Ok(Step::Continue);
        }

        match event {
            Event::Incoming(Packet::ConnAck(ack)) => self.on_connack(&ack),
            Event::Outgoing(Outgoing::Subscribe(pkid)) => {
                if self.state == BridgeState::Subscribing && self.subscribe_pkid.is_none() {
                    self.subscribe_pkid = Some(pkid);
                }
                Ok(Step::Continue)
            }
            Event::Incoming(Packet::SubAck(ack)) => self.on_suback(ack),
            Event::Incoming(Packet::Publish(publish)) if self.is_connected() => {
                Ok(Step::Dispatch(publish))
            }
            _ => Ok(Step::Continue),
        }
    }

    fn on_connack(&mut self, ack: &ConnAck) -> Result<Step, BrokerError> {
        if self.state != BridgeState::Connecting {
            return Ok(Step::Continue);
        }
        // rumqttc surfaces refusals as `ConnectionError::ConnectionRefused`
        // from `poll()`; a refused CONNACK seen as an event fails the same way.
        if ack.code != ConnectReturnCode::Success {
            return Err(self.fail(BrokerError::Refused(format!("{:?}", ack.code))));
        }
        self.state = BridgeState::Subscribing;
        Ok(Step::Subscribe)
    }

    fn on_suback(&mut self, ack: SubAck) -> Result<Step, BrokerError> {
        if self.state != BridgeState::Subscribing {
            return Ok(Step::Continue);
        }
        if self.subscribe_pkid.is_some_and(|pkid| pkid != ack.pkid) {
            return Ok(Step::Continue);
        }

        // One filter was requested, so exactly one return code is expected.
        let qos = match ack.return_codes.as_slice() {
            [] => {
                return Err(self.fail(BrokerError::MalformedAck(
                    "acknowledgment carries no return codes".into(),
                )))
            }
            [SubscribeReasonCode::Success(qos)] => *qos,
            [SubscribeReasonCode::Failure] => {
                return Err(self.fail(BrokerError::NothingGranted {
                    topic: self.topic.clone(),
                }))
            }
            codes => {
                return Err(self.fail(BrokerError::MalformedAck(format!(
                    "expected one return code, got {}",
                    codes.len()
                ))))
            }
        };

        let granted = GrantedTopic {
            topic: self.topic.clone(),
            qos,
        };

        self.state = BridgeState::Listening;
        Ok(Step::Listening(granted))
    }
}

/// Splits `channel/resource`; anything with other than two segments is `None`.
fn split_topic(topic: &str) -> Option<(&str, &str)> {
    let mut parts = topic.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(channel), Some(resource), None) => Some((channel, resource)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connack(code: ConnectReturnCode) -> Event {
        Event::Incoming(Packet::ConnAck(ConnAck::new(code, false)))
    }

    fn suback(pkid: u16, codes: Vec<SubscribeReasonCode>) -> Event {
        Event::Incoming(Packet::SubAck(SubAck::new(pkid, codes)))
    }

    fn publish(payload: &str) -> Event {
        Event::Incoming(Packet::Publish(Publish::new(
            "office/request",
            QoS::AtLeastOnce,
            payload.as_bytes().to_vec(),
        )))
    }

    fn subscribing_session() -> Session {
        let mut session = Session::new("office/request");
        session.start();
        assert!(matches!(
            session.on_event(connack(ConnectReturnCode::Success)),
            Ok(Step::Subscribe)
        ));
        session
            .on_event(Event::Outgoing(Outgoing::Subscribe(1)))
            .unwrap();
        session
    }

    fn listening_session() -> Session {
        let mut session = subscribing_session();
        session
            .on_event(suback(1, vec![SubscribeReasonCode::Success(QoS::AtLeastOnce)]))
            .unwrap();
        assert_eq!(session.state(), BridgeState::Listening);
        session
    }

    #[test]
    fn start_moves_to_connecting() {
        let mut session = Session::new("office/request");
        assert_eq!(session.state(), BridgeState::Disconnected);
        session.start();
        assert_eq!(session.state(), BridgeState::Connecting);
    }

    #[test]
    fn connack_moves_to_subscribing() {
        let session = subscribing_session();
        assert_eq!(session.state(), BridgeState::Subscribing);
        assert!(session.is_connected());
    }

    #[test]
    fn refused_connack_fails() {
        let mut session = Session::new("office/request");
        session.start();

        let err = session
            .on_event(connack(ConnectReturnCode::NotAuthorized))
            .unwrap_err();

        assert!(matches!(err, BrokerError::Refused(_)));
        assert_eq!(session.state(), BridgeState::Failed);
    }

    #[test]
    fn granted_suback_moves_to_listening() {
        let mut session = subscribing_session();

        let step = session
            .on_event(suback(1, vec![SubscribeReasonCode::Success(QoS::AtLeastOnce)]))
            .unwrap();

        match step {
            Step::Listening(granted) => {
                assert_eq!(granted.segments(), Some(("office", "request")));
                assert_eq!(granted.qos, QoS::AtLeastOnce);
            }
            other => panic!("unexpected step: {other:?}"),
        }
        assert_eq!(session.state(), BridgeState::Listening);
    }

    #[test]
    fn downgraded_qos_is_still_granted() {
        let mut session = subscribing_session();
        let step = session
            .on_event(suback(1, vec![SubscribeReasonCode::Success(QoS::AtMostOnce)]))
            .unwrap();
        assert!(matches!(step, Step::Listening(GrantedTopic { qos: QoS::AtMostOnce, .. })));
    }

    #[test]
    fn rejected_suback_fails() {
        let mut session = subscribing_session();

        let err = session
            .on_event(suback(1, vec![SubscribeReasonCode::Failure]))
            .unwrap_err();

        assert!(matches!(err, BrokerError::NothingGranted { .. }));
        assert_eq!(session.state(), BridgeState::Failed);
    }

    #[test]
    fn empty_suback_fails() {
        let mut session = subscribing_session();

        let err = session.on_event(suback(1, vec![])).unwrap_err();

        assert!(matches!(err, BrokerError::MalformedAck(_)));
        assert_eq!(session.state(), BridgeState::Failed);
    }

    #[test]
    fn topic_with_extra_segments_still_listens() {
        let mut session = Session::new("office/room/request");
        session.start();
        session.on_event(connack(ConnectReturnCode::Success)).unwrap();

        let step = session
            .on_event(suback(1, vec![SubscribeReasonCode::Success(QoS::AtLeastOnce)]))
            .unwrap();

        match step {
            Step::Listening(granted) => {
                assert_eq!(granted.topic, "office/room/request");
                assert_eq!(granted.segments(), None);
            }
            other => panic!("unexpected step: {other:?}"),
        }
        assert_eq!(session.state(), BridgeState::Listening);
    }

    #[test]
    fn refused_connection_error_maps_to_refused() {
        let mut session = Session::new("office/request");
        session.start();

        let err = session.connection_failed(&ConnectionError::ConnectionRefused(
            ConnectReturnCode::BadUserNamePassword,
        ));

        assert!(matches!(err, BrokerError::Refused(_)));
        assert_eq!(session.state(), BridgeState::Failed);
    }

    #[test]
    fn suback_for_another_request_is_ignored() {
        let mut session = subscribing_session();

        let step = session
            .on_event(suback(7, vec![SubscribeReasonCode::Success(QoS::AtLeastOnce)]))
            .unwrap();

        assert!(matches!(step, Step::Continue));
        assert_eq!(session.state(), BridgeState::Subscribing);
    }

    #[test]
    fn publish_before_connack_is_not_dispatched() {
        let mut session = Session::new("office/request");
        session.start();
        assert!(matches!(session.on_event(publish("{}")), Ok(Step::Continue)));
    }

    #[test]
    fn publish_before_suback_is_dispatched() {
        let mut session = subscribing_session();

        let step = session
            .on_event(publish(
                r#"{"data":{"response_url":"https://hooks.example.com/commands/1"}}"#,
            ))
            .unwrap();

        assert!(matches!(step, Step::Dispatch(_)));
        assert_eq!(session.state(), BridgeState::Subscribing);

        session
            .on_event(suback(1, vec![SubscribeReasonCode::Success(QoS::AtLeastOnce)]))
            .unwrap();
        assert_eq!(session.state(), BridgeState::Listening);
    }

    #[test]
    fn publish_while_listening_is_dispatched_without_state_change() {
        let mut session = listening_session();

        for _ in 0..3 {
            match session.on_event(publish(r#"{"data":{}}"#)).unwrap() {
                Step::Dispatch(message) => assert_eq!(message.topic, "office/request"),
                other => panic!("unexpected step: {other:?}"),
            }
            assert_eq!(session.state(), BridgeState::Listening);
        }
    }

    #[test]
    fn failed_is_terminal() {
        let mut session = listening_session();
        let _ = session.fail(BrokerError::Connection("reset".into()));

        assert!(matches!(session.on_event(publish("{}")), Ok(Step::Continue)));
        assert!(matches!(
            session.on_event(connack(ConnectReturnCode::Success)),
            Ok(Step::Continue)
        ));
        assert_eq!(session.state(), BridgeState::Failed);
    }

    #[test]
    fn split_topic_requires_two_segments() {
        assert_eq!(split_topic("a/b"), Some(("a", "b")));
        assert_eq!(split_topic("a"), None);
        assert_eq!(split_topic("a/b/c"), None);
    }
}
