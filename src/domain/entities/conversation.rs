use super::{Message, ProfileSummary};
use crate::domain::value_objects::{ConversationId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_USER_LABEL: &str = "Unknown user";

/// 会話の参加者ペア。異なる 2 ユーザーのみ許可する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<UserId>", into = "Vec<UserId>")]
pub struct ParticipantPair([UserId; 2]);

impl ParticipantPair {
    pub fn new(first: UserId, second: UserId) -> Result<Self, String> {
        if first == second {
            return Err(format!(
                "Conversation participants must be distinct (got {first} twice)"
            ));
        }
        Ok(Self([first, second]))
    }

    /// `user` ではない側の参加者。`user` が参加者でなければ `None`。
    pub fn other_than(&self, user: &UserId) -> Option<&UserId> {
        match &self.0 {
            [a, b] if a == user => Some(b),
            [a, b] if b == user => Some(a),
            _ => None,
        }
    }

    pub fn contains(&self, user: &UserId) -> bool {
        self.0.contains(user)
    }

    pub fn as_slice(&self) -> &[UserId] {
        &self.0
    }
}

impl TryFrom<Vec<UserId>> for ParticipantPair {
    type Error = String;

    fn try_from(ids: Vec<UserId>) -> Result<Self, Self::Error> {
        let count = ids.len();
        let mut iter = ids.into_iter();
        match (iter.next(), iter.next(), iter.next()) {
            (Some(first), Some(second), None) => Self::new(first, second),
            _ => Err(format!(
                "Conversation must have exactly two participants (got {count})"
            )),
        }
    }
}

impl From<ParticipantPair> for Vec<UserId> {
    fn from(pair: ParticipantPair) -> Self {
        pair.0.into()
    }
}

/// ゲートウェイから取得した会話行。メッセージは新しい順で埋め込まれる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: ConversationId,
    pub participant_ids: ParticipantPair,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

/// 会話相手。プロフィールが取得できなかった場合は `Unknown` として表示を継続する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Participant {
    Known(ProfileSummary),
    Unknown { id: UserId },
}

impl Participant {
    pub fn id(&self) -> &UserId {
        match self {
            Participant::Known(profile) => &profile.id,
            Participant::Unknown { id } => id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Participant::Known(profile) => &profile.username,
            Participant::Unknown { .. } => UNKNOWN_USER_LABEL,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Participant::Known(_))
    }
}

/// 会話一覧の表示用レコード。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationView {
    pub id: ConversationId,
    pub participant_ids: ParticipantPair,
    pub updated_at: DateTime<Utc>,
    pub other_user: Participant,
    pub last_message: Option<Message>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[test]
    fn pair_rejects_duplicates_and_wrong_sizes() {
        assert!(ParticipantPair::new(user("a"), user("a")).is_err());
        assert!(ParticipantPair::try_from(vec![user("a")]).is_err());
        assert!(ParticipantPair::try_from(vec![user("a"), user("b"), user("c")]).is_err());
        assert!(ParticipantPair::try_from(vec![user("a"), user("b")]).is_ok());
    }

    #[test]
    fn other_than_picks_the_counterpart() {
        let pair = ParticipantPair::new(user("a"), user("b")).unwrap();
        assert_eq!(pair.other_than(&user("a")), Some(&user("b")));
        assert_eq!(pair.other_than(&user("b")), Some(&user("a")));
        assert_eq!(pair.other_than(&user("z")), None);
    }

    #[test]
    fn pair_deserializes_from_json_array() {
        let pair: ParticipantPair = serde_json::from_str(r#"["a","b"]"#).unwrap();
        assert!(pair.contains(&user("b")));
        assert!(serde_json::from_str::<ParticipantPair>(r#"["a","a"]"#).is_err());
    }

    #[test]
    fn unknown_participant_uses_placeholder() {
        let participant = Participant::Unknown { id: user("x") };
        assert_eq!(participant.display_name(), UNKNOWN_USER_LABEL);
        assert_eq!(participant.id(), &user("x"));
        assert!(!participant.is_known());
    }
}
