//! `:shortcode:` emoji replacement.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static SHORTCODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i):([a-z0-9_]+):").unwrap());

const EMOJI: &[(&str, &str)] = &[
    ("smile", "😊"),
    ("grinning", "😀"),
    ("joy", "😂"),
    ("heart", "❤️"),
    ("heart_eyes", "😍"),
    ("fire", "🔥"),
    ("thumbsup", "👍"),
    ("thumbsdown", "👎"),
    ("clap", "👏"),
    ("wave", "👋"),
    ("rocket", "🚀"),
    ("star", "⭐"),
    ("sparkles", "✨"),
    ("tada", "🎉"),
    ("party", "🥳"),
    ("check", "✅"),
    ("x", "❌"),
    ("warning", "⚠️"),
    ("info", "ℹ️"),
    ("question", "❓"),
    ("bulb", "💡"),
    ("idea", "💡"),
    ("memo", "📝"),
    ("book", "📖"),
    ("link", "🔗"),
    ("lock", "🔒"),
    ("key", "🔑"),
    ("gear", "⚙️"),
    ("wrench", "🔧"),
    ("hammer", "🔨"),
    ("bug", "🐛"),
    ("coffee", "☕"),
    ("pizza", "🍕"),
    ("beer", "🍺"),
    ("cake", "🎂"),
    ("sun", "☀️"),
    ("moon", "🌙"),
    ("cloud", "☁️"),
    ("rain", "🌧️"),
    ("snow", "❄️"),
    ("eyes", "👀"),
    ("thinking", "🤔"),
    ("shrug", "🤷"),
    ("facepalm", "🤦"),
    ("pray", "🙏"),
    ("100", "💯"),
    ("muscle", "💪"),
    ("crown", "👑"),
    ("gem", "💎"),
    ("trophy", "🏆"),
    ("arrow_right", "➡️"),
    ("arrow_left", "⬅️"),
    ("arrow_up", "⬆️"),
    ("arrow_down", "⬇️"),
    ("plus", "➕"),
    ("minus", "➖"),
    ("point_right", "👉"),
    ("point_left", "👈"),
];

/// Look up a shortcode name (without colons), ignoring case.
pub fn lookup(name: &str) -> Option<&'static str> {
    EMOJI
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(name))
        .map(|(_, emoji)| *emoji)
}

/// Replace known shortcodes in `text`. Unknown shortcodes are left as typed.
pub fn replace_shortcodes(text: &str) -> Cow<'_, str> {
    if !text.contains(':') {
        return Cow::Borrowed(text);
    }
    SHORTCODE_RE.replace_all(text, |caps: &Captures| match lookup(&caps[1]) {
        Some(emoji) => emoji.to_string(),
        None => caps[0].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_known_codes() {
        assert_eq!(replace_shortcodes("Ship it :rocket:!"), "Ship it 🚀!");
        assert_eq!(replace_shortcodes(":100: :thumbsup:"), "💯 👍");
    }

    #[test]
    fn leaves_unknown_codes() {
        assert_eq!(replace_shortcodes("time 10:30:45"), "time 10:30:45");
        assert_eq!(replace_shortcodes(":nope: :fire:"), ":nope: 🔥");
    }

    #[test]
    fn codes_ignore_case() {
        assert_eq!(replace_shortcodes(":ROCKET:"), "🚀");
        assert_eq!(replace_shortcodes("hot :Fire:"), "hot 🔥");
        assert_eq!(lookup("Thumbsup"), Some("👍"));
    }
}
