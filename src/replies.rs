//! User-facing reply text
//!
//! Messages use WhatsApp markup (`*bold*`). Times are rendered in the
//! offset of the reference clock.

use crate::db::Event;
use chrono::{DateTime, FixedOffset};
use std::fmt::Write as _;

pub const MENU: &str = "📅 *Event Manager Menu* 📅\n\n\
Here's what I can do:\n\
• *View Events* - See your upcoming events\n\
• *Today's Agenda* - See what's happening today\n\
• *Create Event* - Schedule a new event (say 'create meeting tomorrow at 2pm')\n\n\
Just tell me what you'd like to do! 💬";

const INTRO: &str = "I'm your Event Manager bot! 🤖\n\n";

pub const NO_UPCOMING_EVENTS: &str =
    "You have no upcoming events! 🎉\n\nUse 'create' to schedule something new.";

pub const NOTHING_TODAY: &str = "No events scheduled for today! 🕶️\n\nEnjoy your free time!";

pub const CANCELLED: &str = "👍 Okay, I've cancelled that. What would you like to do next?";

pub const RESTART: &str = "Let's try again. What event would you like to create?";

/// Asked when a new description comes back uncertain without a question
pub const START_QUESTION: &str = "Could you provide more details about the event?";

/// Asked when a clarification reply still leaves the event uncertain
pub const CONTINUE_QUESTION: &str = "I'm still not sure. Could you be more specific?";

pub const MISSING_TITLE: &str =
    "❌ I couldn't determine the event title. Please try again with a clearer description.";

pub const MISSING_TIME: &str =
    "❌ I couldn't determine the event time. Please specify when this should happen.";

pub const CREATE_FAILED: &str =
    "❌ Sorry, I couldn't create that event. Please try again with different details.";

pub const GENERIC_ERROR: &str = "Sorry, I encountered an error. Please try again.";

/// Menu prefixed with the bot introduction
pub fn fallback() -> String {
    format!("{INTRO}{MENU}")
}

pub fn clarification(question: Option<&str>, default: &str) -> String {
    format!("🤔 {}", question.unwrap_or(default))
}

pub fn event_created(event: &Event, offset: FixedOffset) -> String {
    let when = event.scheduled_time.with_timezone(&offset);
    let mut text = format!(
        "✅ *Event Created Successfully!* 🎉\n\n*{}*\n📅 {}",
        event.title,
        when.format("%a, %b %d at %I:%M %p")
    );
    if let Some(location) = &event.location {
        let _ = write!(text, " at {location}");
    }
    if !event.notes.is_empty() {
        let _ = write!(text, "\n📄 Notes: {}", event.notes);
    }
    text.push_str("\n\nUse 'events' to see all your upcoming events!");
    text
}

pub fn upcoming_events(events: &[Event], offset: FixedOffset) -> String {
    if events.is_empty() {
        return NO_UPCOMING_EVENTS.to_string();
    }

    let mut text = String::from("📅 *Your Upcoming Events:*\n\n");
    for event in events {
        let when = event.scheduled_time.with_timezone(&offset);
        let _ = writeln!(
            text,
            "• *{}*\n  {}{}\n",
            event.title,
            when.format("%a, %b %d at %I:%M %p"),
            at_location(event)
        );
    }
    text
}

pub fn todays_agenda(events: &[Event], today: DateTime<FixedOffset>) -> String {
    if events.is_empty() {
        return NOTHING_TODAY.to_string();
    }

    let mut text = format!("📋 *Today's Agenda ({}):*\n\n", today.format("%A, %b %d"));
    for event in events {
        let when = event.scheduled_time.with_timezone(today.offset());
        let _ = writeln!(
            text,
            "• *{}* - {}{}",
            when.format("%I:%M %p"),
            event.title,
            at_location(event)
        );
    }
    text
}

fn at_location(event: &Event) -> String {
    event
        .location
        .as_ref()
        .map(|l| format!(" @ {l}"))
        .unwrap_or_default()
}
