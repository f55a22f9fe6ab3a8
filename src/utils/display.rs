//! Display helpers: avatars, initials and clock times

use rand::Rng;

pub const AVATAR_STYLES: [&str; 22] = [
    "adventurer",
    "adventurer-neutral",
    "avataaars",
    "big-ears",
    "big-ears-neutral",
    "big-smile",
    "bottts",
    "croodles",
    "croodles-neutral",
    "fun-emoji",
    "identicon",
    "initials",
    "lorelei",
    "lorelei-neutral",
    "micah",
    "miniavs",
    "notionists",
    "notionists-neutral",
    "open-peeps",
    "personas",
    "pixel-art",
    "pixel-art-neutral",
];

pub const DEFAULT_AVATAR_STYLE: &str = "avataaars";

/// Stable DiceBear avatar for a user id
pub fn avatar_url(user_id: &str, style: &str) -> String {
    format!(
        "https://api.dicebear.com/7.x/{}/svg?seed={}-{}",
        style,
        urlencoding::encode(user_id),
        user_id.chars().count()
    )
}

pub fn random_avatar_url(user_id: &str) -> String {
    let style = AVATAR_STYLES[rand::rng().random_range(0..AVATAR_STYLES.len())];
    avatar_url(user_id, style)
}

/// First letters of the id's words, upper-cased, at most `max_len`
pub fn initials(user_id: &str, max_len: usize) -> String {
    if user_id.is_empty() {
        return "?".into();
    }
    let from_parts: String = user_id
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .take(max_len)
        .collect();
    if from_parts.is_empty() {
        user_id.chars().take(max_len).flat_map(char::to_uppercase).collect()
    } else {
        from_parts
    }
}

/// `m:ss`, with `0:00` for unknown times
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".into();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
