//! Video transport binding derived from the session id.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::SessionId;

/// Channel name and per-party uids used to join the video call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransportBinding {
    pub channel: String,
    pub guest_uid: u32,
    pub practitioner_uid: u32,
}

impl TransportBinding {
    /// Derives the binding deterministically from the session id.
    ///
    /// Guest uids are always odd and practitioner uids always even and
    /// non-zero, so the two never collide.
    pub fn for_session(id: &SessionId) -> Self {
        let bytes = id.as_uuid().as_bytes();
        let a = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let b = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

        Self {
            channel: format!("session-{}", id.as_uuid().simple()),
            guest_uid: (a >> 1) | 1,
            practitioner_uid: ((b >> 1) & !1) | 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn channel_uses_simple_uuid_form() {
        let uuid = Uuid::parse_str("6f9619ff-8b86-d011-b42d-00c04fc964ff").unwrap();
        let binding = TransportBinding::for_session(&SessionId::from_uuid(uuid));
        assert_eq!(binding.channel, "session-6f9619ff8b86d011b42d00c04fc964ff");
    }

    #[test]
    fn uids_are_nonzero_and_distinct() {
        for _ in 0..200 {
            let binding = TransportBinding::for_session(&SessionId::new());
            assert_ne!(binding.guest_uid, 0);
            assert_ne!(binding.practitioner_uid, 0);
            assert_ne!(binding.guest_uid, binding.practitioner_uid);
        }
    }

    #[test]
    fn all_zero_id_still_yields_valid_uids() {
        let binding = TransportBinding::for_session(&SessionId::from_uuid(Uuid::nil()));
        assert_eq!(binding.guest_uid, 1);
        assert_eq!(binding.practitioner_uid, 2);
    }

    #[test]
    fn derivation_is_deterministic() {
        let id = SessionId::new();
        assert_eq!(TransportBinding::for_session(&id), TransportBinding::for_session(&id));
    }
}
