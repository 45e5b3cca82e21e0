//! Pure session state machine.
//!
//! `decide` is side-effect free: it reads the session as persisted, checks
//! who is asking and whether the action is legal in the current phase, and
//! returns the patch to write. Releasing the practitioner from service when
//! a patch ends the session is left to the caller.
//!
//! Authorization is evaluated before phase, so a stranger always gets
//! `NotParticipant` and a guest issuing a practitioner-only action always
//! gets `NotPractitioner`. A participant action on a waiting session past
//! its deadline ends the session as timed out instead of taking effect.

use crate::domain::foundation::{SessionPhase, Timestamp};

use super::{Actor, EndReason, PartyRole, Rejection, Session, SessionAction, SessionPatch};

/// Decides the effect of `action` by `actor` on `session` at `now`.
///
/// An empty patch means the action was accepted as a no-op (repeated
/// readiness, ending an ended session, an unexpired sweep).
pub fn decide(
    session: &Session,
    actor: &Actor,
    action: SessionAction,
    now: Timestamp,
) -> Result<SessionPatch, Rejection> {
    if action.is_system() {
        if *actor != Actor::System {
            return Err(Rejection::NotParticipant);
        }
        return Ok(decide_system(session, action, now));
    }

    let role = actor
        .user_id()
        .and_then(|id| session.role_of(id))
        .ok_or(Rejection::NotParticipant)?;

    if session.is_waiting_expired(&now) {
        return expire_on_arrival(role, action, now);
    }

    match action {
        SessionAction::Acknowledge => acknowledge(session, role),
        SessionAction::MarkReady => mark_ready(session, role, now),
        SessionAction::Accept => accept(session, role, now),
        SessionAction::Reject => reject(session, role, now),
        SessionAction::End => end(session, role, now),
        SessionAction::TimeoutSweep | SessionAction::CountdownElapsed { .. } => {
            Err(Rejection::NotParticipant)
        }
    }
}

/// A waiting session past its deadline ends as timed out whatever the
/// participant asked for. Role checks still apply.
fn expire_on_arrival(
    role: PartyRole,
    action: SessionAction,
    now: Timestamp,
) -> Result<SessionPatch, Rejection> {
    if matches!(
        action,
        SessionAction::Acknowledge | SessionAction::Accept | SessionAction::Reject
    ) {
        require_practitioner(role)?;
    }
    Ok(SessionPatch::end(EndReason::WaitingTimedOut, now))
}

fn wrong_phase(session: &Session, action: SessionAction) -> Rejection {
    Rejection::WrongPhase {
        phase: session.phase(),
        action: action.as_str(),
    }
}

fn require_practitioner(role: PartyRole) -> Result<(), Rejection> {
    match role {
        PartyRole::Practitioner => Ok(()),
        PartyRole::Guest => Err(Rejection::NotPractitioner),
    }
}

fn acknowledge(session: &Session, role: PartyRole) -> Result<SessionPatch, Rejection> {
    require_practitioner(role)?;

    match session.phase() {
        SessionPhase::Waiting if session.acknowledged_practitioner() => Ok(SessionPatch::empty()),
        SessionPhase::Waiting => Ok(SessionPatch {
            acknowledged_practitioner: Some(true),
            ..SessionPatch::default()
        }),
        _ => Err(wrong_phase(session, SessionAction::Acknowledge)),
    }
}

fn mark_ready(
    session: &Session,
    role: PartyRole,
    now: Timestamp,
) -> Result<SessionPatch, Rejection> {
    match session.phase() {
        SessionPhase::Waiting | SessionPhase::Live if session.is_ready(role) => {
            Ok(SessionPatch::empty())
        }
        SessionPhase::Waiting => {
            if role == PartyRole::Practitioner && !session.acknowledged_practitioner() {
                return Err(Rejection::AcknowledgmentRequired);
            }
            let mut patch = SessionPatch::default();
            set_ready(&mut patch, role);
            Ok(flip_if_both_ready(session, patch, now))
        }
        _ => Err(wrong_phase(session, SessionAction::MarkReady)),
    }
}

fn accept(session: &Session, role: PartyRole, now: Timestamp) -> Result<SessionPatch, Rejection> {
    require_practitioner(role)?;

    match session.phase() {
        SessionPhase::Waiting
            if session.acknowledged_practitioner() && session.ready_practitioner() =>
        {
            Ok(SessionPatch::empty())
        }
        SessionPhase::Waiting => {
            let patch = SessionPatch {
                acknowledged_practitioner: Some(true),
                ready_practitioner: Some(true),
                ..SessionPatch::default()
            };
            Ok(flip_if_both_ready(session, patch, now))
        }
        _ => Err(wrong_phase(session, SessionAction::Accept)),
    }
}

fn reject(session: &Session, role: PartyRole, now: Timestamp) -> Result<SessionPatch, Rejection> {
    require_practitioner(role)?;

    match session.phase() {
        SessionPhase::Ended => Ok(SessionPatch::empty()),
        SessionPhase::Waiting => Ok(SessionPatch::end(EndReason::Rejected, now)),
        SessionPhase::Live => Err(wrong_phase(session, SessionAction::Reject)),
    }
}

fn end(session: &Session, role: PartyRole, now: Timestamp) -> Result<SessionPatch, Rejection> {
    match session.phase() {
        SessionPhase::Ended => Ok(SessionPatch::empty()),
        SessionPhase::Waiting | SessionPhase::Live => {
            Ok(SessionPatch::end(EndReason::ended_by(role), now))
        }
    }
}

fn decide_system(session: &Session, action: SessionAction, now: Timestamp) -> SessionPatch {
    match (action, session.phase()) {
        (SessionAction::TimeoutSweep, SessionPhase::Waiting)
            if session.is_waiting_expired(&now) =>
        {
            SessionPatch::end(EndReason::WaitingTimedOut, now)
        }
        (SessionAction::CountdownElapsed { grace_secs }, SessionPhase::Live) => {
            match session.live_deadline() {
                Some(deadline) if now.is_after(&deadline.plus_secs(grace_secs)) => {
                    SessionPatch::end(EndReason::CountdownElapsed, now)
                }
                _ => SessionPatch::empty(),
            }
        }
        _ => SessionPatch::empty(),
    }
}

fn set_ready(patch: &mut SessionPatch, role: PartyRole) {
    match role {
        PartyRole::Guest => patch.ready_guest = Some(true),
        PartyRole::Practitioner => patch.ready_practitioner = Some(true),
    }
}

/// Any patch that leaves both ready flags true in `waiting` goes live.
fn flip_if_both_ready(session: &Session, mut patch: SessionPatch, now: Timestamp) -> SessionPatch {
    let guest = patch.ready_guest.unwrap_or(false) || session.ready_guest();
    let practitioner = patch.ready_practitioner.unwrap_or(false) || session.ready_practitioner();

    if guest && practitioner {
        patch.phase = Some(SessionPhase::Live);
        patch.live_started_at = Some(now);
    }
    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{SessionId, UserId};

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn guest() -> Actor {
        Actor::User(uid("guest"))
    }

    fn practitioner() -> Actor {
        Actor::User(uid("healer"))
    }

    fn t0() -> Timestamp {
        Timestamp::from_unix_secs(1_700_000_000)
    }

    fn waiting() -> Session {
        Session::new(SessionId::new(), uid("guest"), uid("healer"), 120, 900, t0()).unwrap()
    }

    fn step(session: &Session, actor: &Actor, action: SessionAction, now: Timestamp) -> Session {
        let patch = decide(session, actor, action, now).unwrap();
        session.apply(&patch, now).unwrap()
    }

    fn live() -> Session {
        let s = step(&waiting(), &practitioner(), SessionAction::Accept, t0());
        step(&s, &guest(), SessionAction::MarkReady, t0().plus_secs(3))
    }

    fn ended() -> Session {
        step(&waiting(), &guest(), SessionAction::End, t0())
    }

    // ───────────────────────────────────────────────────────────────
    // Authorization
    // ───────────────────────────────────────────────────────────────

    #[test]
    fn stranger_is_not_participant_for_every_action() {
        let stranger = Actor::User(uid("stranger"));
        for action in [
            SessionAction::Acknowledge,
            SessionAction::MarkReady,
            SessionAction::Accept,
            SessionAction::Reject,
            SessionAction::End,
        ] {
            assert_eq!(
                decide(&ended(), &stranger, action, t0()),
                Err(Rejection::NotParticipant)
            );
        }
    }

    #[test]
    fn guest_cannot_use_practitioner_actions() {
        for action in [
            SessionAction::Acknowledge,
            SessionAction::Accept,
            SessionAction::Reject,
        ] {
            assert_eq!(
                decide(&waiting(), &guest(), action, t0()),
                Err(Rejection::NotPractitioner)
            );
        }
    }

    #[test]
    fn users_cannot_issue_system_actions() {
        assert_eq!(
            decide(&waiting(), &guest(), SessionAction::TimeoutSweep, t0().plus_secs(500)),
            Err(Rejection::NotParticipant)
        );
    }

    #[test]
    fn system_cannot_issue_participant_actions() {
        assert_eq!(
            decide(&waiting(), &Actor::System, SessionAction::End, t0()),
            Err(Rejection::NotParticipant)
        );
    }

    // ───────────────────────────────────────────────────────────────
    // Acknowledge / ready / accept
    // ───────────────────────────────────────────────────────────────

    #[test]
    fn acknowledge_sets_flag_then_is_noop() {
        let patch = decide(&waiting(), &practitioner(), SessionAction::Acknowledge, t0()).unwrap();
        assert_eq!(patch.acknowledged_practitioner, Some(true));

        let acked = waiting().apply(&patch, t0()).unwrap();
        let again = decide(&acked, &practitioner(), SessionAction::Acknowledge, t0()).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn acknowledge_after_live_is_wrong_phase() {
        assert!(matches!(
            decide(&live(), &practitioner(), SessionAction::Acknowledge, t0()),
            Err(Rejection::WrongPhase { phase: SessionPhase::Live, .. })
        ));
    }

    #[test]
    fn practitioner_ready_without_ack_is_rejected() {
        assert_eq!(
            decide(&waiting(), &practitioner(), SessionAction::MarkReady, t0()),
            Err(Rejection::AcknowledgmentRequired)
        );
    }

    #[test]
    fn first_ready_only_sets_own_flag() {
        let patch = decide(&waiting(), &guest(), SessionAction::MarkReady, t0()).unwrap();
        assert_eq!(patch.ready_guest, Some(true));
        assert_eq!(patch.phase, None);
        assert_eq!(patch.live_started_at, None);
    }

    #[test]
    fn second_ready_flips_to_live_at_call_time() {
        let s = step(&waiting(), &guest(), SessionAction::MarkReady, t0());
        let s = step(&s, &practitioner(), SessionAction::Acknowledge, t0());

        let now = t0().plus_secs(42);
        let patch = decide(&s, &practitioner(), SessionAction::MarkReady, now).unwrap();
        assert_eq!(patch.phase, Some(SessionPhase::Live));
        assert_eq!(patch.live_started_at, Some(now));

        let s = s.apply(&patch, now).unwrap();
        assert_eq!(s.phase(), SessionPhase::Live);
        assert_eq!(s.live_started_at(), Some(&now));
    }

    #[test]
    fn repeated_ready_is_noop_in_waiting_and_live() {
        let s = step(&waiting(), &guest(), SessionAction::MarkReady, t0());
        assert!(decide(&s, &guest(), SessionAction::MarkReady, t0()).unwrap().is_empty());

        let s = live();
        assert!(decide(&s, &guest(), SessionAction::MarkReady, t0()).unwrap().is_empty());
        assert!(decide(&s, &practitioner(), SessionAction::MarkReady, t0())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn ready_after_end_is_wrong_phase() {
        assert!(matches!(
            decide(&ended(), &guest(), SessionAction::MarkReady, t0()),
            Err(Rejection::WrongPhase { phase: SessionPhase::Ended, .. })
        ));
    }

    #[test]
    fn accept_sets_both_practitioner_flags_without_going_live() {
        let patch = decide(&waiting(), &practitioner(), SessionAction::Accept, t0()).unwrap();
        assert_eq!(patch.acknowledged_practitioner, Some(true));
        assert_eq!(patch.ready_practitioner, Some(true));
        assert_eq!(patch.phase, None);
    }

    #[test]
    fn accept_goes_live_when_guest_already_ready() {
        let s = step(&waiting(), &guest(), SessionAction::MarkReady, t0());
        let patch = decide(&s, &practitioner(), SessionAction::Accept, t0()).unwrap();
        assert!(patch.goes_live());
    }

    #[test]
    fn repeated_accept_is_noop() {
        let s = step(&waiting(), &practitioner(), SessionAction::Accept, t0());
        assert!(decide(&s, &practitioner(), SessionAction::Accept, t0()).unwrap().is_empty());
    }

    // ───────────────────────────────────────────────────────────────
    // Termination
    // ───────────────────────────────────────────────────────────────

    #[test]
    fn reject_ends_waiting_session() {
        let patch = decide(&waiting(), &practitioner(), SessionAction::Reject, t0()).unwrap();
        assert!(patch.ends_session());
        assert_eq!(patch.end_reason, Some(EndReason::Rejected));
        assert_eq!(patch.ended_at, Some(t0()));
    }

    #[test]
    fn reject_live_session_is_wrong_phase() {
        assert!(matches!(
            decide(&live(), &practitioner(), SessionAction::Reject, t0()),
            Err(Rejection::WrongPhase { .. })
        ));
    }

    #[test]
    fn end_records_which_side_ended() {
        let by_guest = decide(&live(), &guest(), SessionAction::End, t0()).unwrap();
        assert_eq!(by_guest.end_reason, Some(EndReason::EndedByGuest));

        let by_practitioner = decide(&waiting(), &practitioner(), SessionAction::End, t0()).unwrap();
        assert_eq!(by_practitioner.end_reason, Some(EndReason::EndedByPractitioner));
    }

    #[test]
    fn terminal_actions_on_ended_session_are_noops() {
        let s = ended();
        assert!(decide(&s, &guest(), SessionAction::End, t0()).unwrap().is_empty());
        assert!(decide(&s, &practitioner(), SessionAction::End, t0()).unwrap().is_empty());
        assert!(decide(&s, &practitioner(), SessionAction::Reject, t0()).unwrap().is_empty());
        assert!(decide(&s, &Actor::System, SessionAction::TimeoutSweep, t0().plus_secs(999))
            .unwrap()
            .is_empty());
    }

    // ───────────────────────────────────────────────────────────────
    // System actions
    // ───────────────────────────────────────────────────────────────

    #[test]
    fn sweep_ends_only_expired_waiting_sessions() {
        let s = waiting();
        assert!(decide(&s, &Actor::System, SessionAction::TimeoutSweep, t0().plus_secs(120))
            .unwrap()
            .is_empty());

        let patch =
            decide(&s, &Actor::System, SessionAction::TimeoutSweep, t0().plus_secs(121)).unwrap();
        assert_eq!(patch.end_reason, Some(EndReason::WaitingTimedOut));
    }

    #[test]
    fn ready_after_waiting_deadline_times_out_instead_of_going_live() {
        let s = step(&waiting(), &practitioner(), SessionAction::Accept, t0());
        let late = t0().plus_secs(121);

        let patch = decide(&s, &guest(), SessionAction::MarkReady, late).unwrap();

        assert!(!patch.goes_live());
        assert_eq!(patch.end_reason, Some(EndReason::WaitingTimedOut));
        assert_eq!(patch.ended_at, Some(late));
    }

    #[test]
    fn expired_waiting_session_still_checks_roles() {
        let late = t0().plus_secs(600);
        assert_eq!(
            decide(&waiting(), &guest(), SessionAction::Accept, late),
            Err(Rejection::NotPractitioner)
        );
        assert_eq!(
            decide(&waiting(), &Actor::User(uid("stranger")), SessionAction::End, late),
            Err(Rejection::NotParticipant)
        );
        let patch = decide(&waiting(), &practitioner(), SessionAction::Reject, late).unwrap();
        assert_eq!(patch.end_reason, Some(EndReason::WaitingTimedOut));
    }

    #[test]
    fn sweep_ignores_live_sessions() {
        assert!(decide(&live(), &Actor::System, SessionAction::TimeoutSweep, t0().plus_secs(5000))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn countdown_elapsed_respects_grace() {
        let s = live();
        let went_live = *s.live_started_at().unwrap();
        let action = SessionAction::CountdownElapsed { grace_secs: 60 };

        let inside = went_live.plus_secs(900 + 60);
        assert!(decide(&s, &Actor::System, action, inside).unwrap().is_empty());

        let past = went_live.plus_secs(900 + 61);
        let patch = decide(&s, &Actor::System, action, past).unwrap();
        assert_eq!(patch.end_reason, Some(EndReason::CountdownElapsed));
    }

    // ───────────────────────────────────────────────────────────────
    // Properties
    // ───────────────────────────────────────────────────────────────

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn any_actor() -> impl Strategy<Value = Actor> {
            prop_oneof![
                Just(Actor::User(UserId::new("guest").unwrap())),
                Just(Actor::User(UserId::new("healer").unwrap())),
                Just(Actor::User(UserId::new("stranger").unwrap())),
                Just(Actor::System),
            ]
        }

        fn any_action() -> impl Strategy<Value = SessionAction> {
            prop_oneof![
                Just(SessionAction::Acknowledge),
                Just(SessionAction::MarkReady),
                Just(SessionAction::Accept),
                Just(SessionAction::Reject),
                Just(SessionAction::End),
                Just(SessionAction::TimeoutSweep),
                (0u64..300).prop_map(|grace_secs| SessionAction::CountdownElapsed { grace_secs }),
            ]
        }

        proptest! {
            #[test]
            fn phase_never_moves_backwards(
                steps in prop::collection::vec((any_actor(), any_action(), 0u64..400), 1..40)
            ) {
                let mut session = waiting();
                let mut now = t0();

                for (actor, action, advance) in steps {
                    now = now.plus_secs(advance);
                    let before = session.clone();

                    if let Ok(patch) = decide(&session, &actor, action, now) {
                        session = session.apply(&patch, now).unwrap();
                    }

                    prop_assert!(session.phase().ordinal() >= before.phase().ordinal());
                    prop_assert!(session.ready_guest() >= before.ready_guest());
                    prop_assert!(session.ready_practitioner() >= before.ready_practitioner());
                    prop_assert!(
                        session.acknowledged_practitioner() >= before.acknowledged_practitioner()
                    );
                    if session.phase() == SessionPhase::Live {
                        prop_assert!(session.live_started_at().is_some());
                    }
                    if session.phase() == SessionPhase::Waiting {
                        prop_assert!(session.live_started_at().is_none());
                    }
                    if session.phase() == SessionPhase::Ended {
                        prop_assert!(session.ended_at().is_some());
                        prop_assert!(session.end_reason().is_some());
                    }
                }
            }

            #[test]
            fn nothing_goes_live_after_waiting_deadline(
                actor in any_actor(),
                action in any_action(),
                late in 121u64..5000,
            ) {
                let s = step(&waiting(), &practitioner(), SessionAction::Accept, t0());
                if let Ok(patch) = decide(&s, &actor, action, t0().plus_secs(late)) {
                    prop_assert!(!patch.goes_live());
                }
            }

            #[test]
            fn unacknowledged_practitioner_ready_always_rejected(advance in 0u64..100) {
                let s = step(&waiting(), &guest(), SessionAction::MarkReady, t0());
                prop_assert_eq!(
                    decide(&s, &practitioner(), SessionAction::MarkReady, t0().plus_secs(advance)),
                    Err(Rejection::AcknowledgmentRequired)
                );
            }
        }
    }
}
