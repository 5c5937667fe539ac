//! Intent classification
//!
//! Messages are matched against an ordered rule table; the first matching
//! rule wins. Order matters: "schedule" lists events even though it also
//! reads as a request to create one.

use regex::Regex;
use std::sync::LazyLock;

static TIME_OF_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{1,2}(?::\d{2})?\s*(?:am|pm)?\b").expect("Invalid regex")
});

pub const GREETINGS: &[&str] = &["hi", "hello", "hey", "start", "help", "menu"];
pub const UPCOMING_WORDS: &[&str] = &["events", "upcoming", "schedule", "plans"];
pub const TODAY_WORDS: &[&str] = &["today", "today's", "agenda"];
pub const CANCEL_WORDS: &[&str] = &["cancel", "clear", "stop"];
pub const CREATE_WORDS: &[&str] = &["create", "schedule", "appointment", "meeting", "remind", "set up"];

pub const DATE_WORDS: &[&str] = &[
    "today", "tomorrow", "tonight", "next", "week", "weekend", "morning", "afternoon",
    "evening", "noon", "midnight",
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
    "mon", "tue", "wed", "thu", "fri", "sat", "sun",
    "january", "february", "march", "april", "may", "june", "july", "august",
    "september", "october", "november", "december",
    "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept", "oct", "nov", "dec",
];

/// Minimum token count for a date/time mention to count as a description
const MIN_DESCRIPTION_TOKENS: usize = 3;

/// What the user wants from this message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Menu,
    ListUpcoming,
    ListToday,
    Cancel,
    /// Free text answering an open clarification dialog
    ContinueDialog,
    CreateEvent,
    Fallback,
}

/// How a rule tests the normalized message
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    /// Whole message equals one of the words
    Exact(&'static [&'static str]),
    /// Message contains one of the words as a substring
    Contains(&'static [&'static str]),
    /// A clarification dialog is open
    DialogActive,
    /// Message reads like a new event description
    EventDescription,
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub matcher: Matcher,
    pub intent: Intent,
}

const fn rule(matcher: Matcher, intent: Intent) -> Rule {
    Rule { matcher, intent }
}

/// Default precedence chain
pub const STANDARD_RULES: &[Rule] = &[
    rule(Matcher::Exact(GREETINGS), Intent::Menu),
    rule(Matcher::Contains(UPCOMING_WORDS), Intent::ListUpcoming),
    rule(Matcher::Contains(TODAY_WORDS), Intent::ListToday),
    rule(Matcher::Contains(CANCEL_WORDS), Intent::Cancel),
    rule(Matcher::DialogActive, Intent::ContinueDialog),
    rule(Matcher::EventDescription, Intent::CreateEvent),
];

/// Ordered rule table with a fallback intent
#[derive(Debug, Clone)]
pub struct IntentRouter {
    rules: Vec<Rule>,
}

impl Default for IntentRouter {
    fn default() -> Self {
        Self::with_rules(STANDARD_RULES.to_vec())
    }
}

impl IntentRouter {
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Classify `text`; `dialog_active` is whether the sender has an open dialog
    pub fn classify(&self, text: &str, dialog_active: bool) -> Intent {
        let normalized = text.trim().to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule_matches(rule.matcher, &normalized, dialog_active))
            .map_or(Intent::Fallback, |rule| rule.intent)
    }
}

fn rule_matches(matcher: Matcher, text: &str, dialog_active: bool) -> bool {
    match matcher {
        Matcher::Exact(words) => words.contains(&text),
        Matcher::Contains(words) => words.iter().any(|w| text.contains(w)),
        Matcher::DialogActive => dialog_active,
        Matcher::EventDescription => looks_like_event(text),
    }
}

/// A date or time mention in a message of a few words, or an explicit
/// creation keyword at any length
pub fn looks_like_event(text: &str) -> bool {
    let mentions_when = TIME_OF_DAY.is_match(text)
        || text
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .any(|token| DATE_WORDS.contains(&token));
    let long_enough = text.split_whitespace().count() >= MIN_DESCRIPTION_TOKENS;

    (mentions_when && long_enough) || CREATE_WORDS.iter().any(|w| text.contains(w))
}
