use crate::question::Question;
use crate::settings::Locale;

const ALT_NUMERALS: [char; 10] = ['一', '二', '三', '四', '五', '六', '七', '八', '九', '十'];

/// Locale strategy for everything the drill says or shows as text.
pub trait Phrasebook: Send {
    fn locale(&self) -> Locale;

    /// The spoken question for a pair of counts.
    fn prompt(&self, left: u32, right: u32) -> String;

    fn welcome(&self) -> String;

    fn success(&self, question: &Question) -> String;

    fn incorrect(&self) -> String;

    /// Language tag used to pick a voice, `None` for the platform default.
    fn voice_hint(&self) -> Option<&'static str>;
}

pub fn phrasebook_for(locale: Locale) -> Box<dyn Phrasebook> {
    match locale {
        Locale::Default => Box::new(English),
        Locale::Alt => Box::new(Chinese),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct English;

fn fingers(n: u32) -> String {
    if n == 1 {
        format!("{} finger", n)
    } else {
        format!("{} fingers", n)
    }
}

impl Phrasebook for English {
    fn locale(&self) -> Locale {
        Locale::Default
    }

    fn prompt(&self, left: u32, right: u32) -> String {
        format!(
            "I have {} on the left and {} on the right. How many fingers are there?",
            fingers(left),
            fingers(right)
        )
    }

    fn welcome(&self) -> String {
        "Welcome! Let's count fingers together.".to_string()
    }

    fn success(&self, q: &Question) -> String {
        format!(
            "Very nice. {} plus {} equals {}.",
            q.left_count, q.right_count, q.total
        )
    }

    fn incorrect(&self) -> String {
        "Incorrect. Please try again.".to_string()
    }

    fn voice_hint(&self) -> Option<&'static str> {
        None
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Chinese;

/// Numeral glyph for 1..=10.
pub fn alt_numeral(n: u32) -> Option<char> {
    match n {
        1..=10 => Some(ALT_NUMERALS[(n - 1) as usize]),
        _ => None,
    }
}

// Counts without a glyph leave their slot empty.
fn glyph(n: u32) -> String {
    alt_numeral(n).map(String::from).unwrap_or_default()
}

impl Phrasebook for Chinese {
    fn locale(&self) -> Locale {
        Locale::Alt
    }

    fn prompt(&self, left: u32, right: u32) -> String {
        format!(
            "我左手有{}根手指，右手有{}根手指。一共有几根手指？",
            glyph(left),
            glyph(right)
        )
    }

    fn welcome(&self) -> String {
        "你好！我们一起来数手指吧。".to_string()
    }

    fn success(&self, q: &Question) -> String {
        format!(
            "很好。{}加{}等于{}。",
            glyph(q.left_count),
            glyph(q.right_count),
            q.total
        )
    }

    fn incorrect(&self) -> String {
        "不对。请再试一次。".to_string()
    }

    fn voice_hint(&self) -> Option<&'static str> {
        Some("zh")
    }
}
