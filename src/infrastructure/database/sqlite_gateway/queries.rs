pub(super) const SELECT_PROFILE_BY_ID: &str = r#"
    SELECT id, username, bio, avatar_url, full_name, created_at, updated_at
    FROM profiles
    WHERE id = ?1
"#;

pub(super) const SELECT_PROFILE_SUMMARIES: &str = r#"
    SELECT id, username, avatar_url, full_name
    FROM profiles
    ORDER BY username ASC
"#;

pub(super) const UPSERT_PROFILE: &str = r#"
    INSERT INTO profiles (id, username, bio, avatar_url, full_name, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(id) DO UPDATE SET
        username = excluded.username,
        bio = excluded.bio,
        avatar_url = excluded.avatar_url,
        full_name = excluded.full_name,
        updated_at = excluded.updated_at
"#;

pub(super) const INSERT_EVENT: &str = r#"
    INSERT INTO events (
        id, user_id, name, description, start_datetime, end_datetime, price,
        address_street, address_postal, address_city, address_extra,
        visibility, event_type, photo_url, created_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
"#;

/// 作成者プロフィールを結合したイベント列。後続に WHERE / ORDER BY を付けて使う。
pub(super) const SELECT_EVENTS_WITH_CREATOR: &str = r#"
    SELECT e.id, e.user_id, e.name, e.description, e.start_datetime, e.end_datetime, e.price,
           e.address_street, e.address_postal, e.address_city, e.address_extra,
           e.visibility, e.event_type, e.photo_url, e.created_at,
           p.username AS creator_username,
           p.avatar_url AS creator_avatar_url,
           p.full_name AS creator_full_name
    FROM events e
    LEFT JOIN profiles p ON p.id = e.user_id
"#;

pub(super) const DELETE_EVENT: &str = "DELETE FROM events WHERE id = ?1";
pub(super) const DELETE_SAVED_EVENTS_FOR_EVENT: &str =
    "DELETE FROM saved_events WHERE event_id = ?1";
pub(super) const DELETE_COMMENTS_FOR_EVENT: &str = "DELETE FROM comments WHERE event_id = ?1";
pub(super) const DELETE_REPORTS_FOR_EVENT: &str = "DELETE FROM event_reports WHERE event_id = ?1";

pub(super) const INSERT_FOLLOW: &str = r#"
    INSERT INTO follows (follower_id, following_id, created_at)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(follower_id, following_id) DO NOTHING
"#;

pub(super) const DELETE_FOLLOW: &str = r#"
    DELETE FROM follows
    WHERE follower_id = ?1 AND following_id = ?2
"#;

pub(super) const SELECT_FOLLOW_EXISTS: &str = r#"
    SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ?1 AND following_id = ?2)
"#;

pub(super) const COUNT_FOLLOWERS: &str = "SELECT COUNT(*) FROM follows WHERE following_id = ?1";
pub(super) const COUNT_FOLLOWING: &str = "SELECT COUNT(*) FROM follows WHERE follower_id = ?1";

pub(super) const INSERT_SAVED_EVENT: &str = r#"
    INSERT INTO saved_events (user_id, event_id, created_at)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(user_id, event_id) DO NOTHING
"#;

pub(super) const DELETE_SAVED_EVENT: &str = r#"
    DELETE FROM saved_events
    WHERE user_id = ?1 AND event_id = ?2
"#;

pub(super) const SELECT_SAVED_EVENT_EXISTS: &str = r#"
    SELECT EXISTS(SELECT 1 FROM saved_events WHERE user_id = ?1 AND event_id = ?2)
"#;

pub(super) const COUNT_SAVES: &str = "SELECT COUNT(*) FROM saved_events WHERE event_id = ?1";

pub(super) const SELECT_CONVERSATIONS_FOR_USER: &str = r#"
    SELECT c.id, c.participant_ids, c.updated_at
    FROM conversations c
    WHERE EXISTS (SELECT 1 FROM json_each(c.participant_ids) WHERE json_each.value = ?1)
    ORDER BY c.updated_at DESC
"#;

pub(super) const SELECT_CONVERSATION_BY_KEY: &str = r#"
    SELECT id, participant_ids, updated_at
    FROM conversations
    WHERE participant_key = ?1
"#;

pub(super) const INSERT_CONVERSATION: &str = r#"
    INSERT INTO conversations (id, participant_ids, participant_key, updated_at)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(participant_key) DO NOTHING
"#;

pub(super) const TOUCH_CONVERSATION: &str = r#"
    UPDATE conversations
    SET updated_at = ?2
    WHERE id = ?1
"#;

pub(super) const SELECT_LATEST_MESSAGE: &str = r#"
    SELECT id, conversation_id, sender_id, content, created_at
    FROM messages
    WHERE conversation_id = ?1
    ORDER BY created_at DESC, rowid DESC
    LIMIT 1
"#;

pub(super) const SELECT_LATEST_MESSAGES_FOR_USER: &str = r#"
    SELECT id, conversation_id, sender_id, content, created_at
    FROM (
        SELECT m.id, m.conversation_id, m.sender_id, m.content, m.created_at,
               ROW_NUMBER() OVER (
                   PARTITION BY m.conversation_id
                   ORDER BY m.created_at DESC, m.rowid DESC
               ) AS position
        FROM messages m
        JOIN conversations c ON c.id = m.conversation_id
        WHERE EXISTS (SELECT 1 FROM json_each(c.participant_ids) WHERE json_each.value = ?1)
    )
    WHERE position = 1
"#;

pub(super) const SELECT_MESSAGES_WITH_SENDER: &str = r#"
    SELECT m.id, m.conversation_id, m.sender_id, m.content, m.created_at,
           p.username AS sender_username,
           p.avatar_url AS sender_avatar_url,
           p.full_name AS sender_full_name
    FROM messages m
    LEFT JOIN profiles p ON p.id = m.sender_id
    WHERE m.conversation_id = ?1
    ORDER BY m.created_at ASC, m.rowid ASC
"#;

pub(super) const INSERT_MESSAGE: &str = r#"
    INSERT INTO messages (id, conversation_id, sender_id, content, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5)
"#;

pub(super) const SELECT_COMMENTS_WITH_AUTHOR: &str = r#"
    SELECT c.id, c.event_id, c.user_id, c.content, c.created_at,
           p.username AS author_username,
           p.avatar_url AS author_avatar_url,
           p.full_name AS author_full_name
    FROM comments c
    LEFT JOIN profiles p ON p.id = c.user_id
    WHERE c.event_id = ?1
    ORDER BY c.created_at DESC, c.rowid DESC
"#;

pub(super) const SELECT_COMMENT_WITH_AUTHOR: &str = r#"
    SELECT c.id, c.event_id, c.user_id, c.content, c.created_at,
           p.username AS author_username,
           p.avatar_url AS author_avatar_url,
           p.full_name AS author_full_name
    FROM comments c
    LEFT JOIN profiles p ON p.id = c.user_id
    WHERE c.id = ?1
"#;

pub(super) const INSERT_COMMENT: &str = r#"
    INSERT INTO comments (id, event_id, user_id, content, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5)
"#;

pub(super) const INSERT_REPORT: &str = r#"
    INSERT INTO event_reports (id, event_id, user_id, reason, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5)
"#;

pub(super) const SELECT_REPORT_PAGE: &str = r#"
    SELECT r.id, r.event_id, r.user_id, r.reason, r.created_at,
           e.name AS event_name,
           e.address_city AS event_city,
           p.username AS reporter_username,
           p.avatar_url AS reporter_avatar_url,
           p.full_name AS reporter_full_name
    FROM event_reports r
    LEFT JOIN events e ON e.id = r.event_id
    LEFT JOIN profiles p ON p.id = r.user_id
    ORDER BY r.created_at DESC, r.rowid DESC
    LIMIT ?1 OFFSET ?2
"#;

pub(super) const COUNT_REPORTS: &str = "SELECT COUNT(*) FROM event_reports";
