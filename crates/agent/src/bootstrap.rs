//! The canned opening monologue.
//!
//! Before its first live decision an agent is seeded with a scripted
//! inner monologue that walks through its own capabilities. Plain lines
//! are thoughts. A line starting with one of the sentinel prefixes is an
//! action, and the line right after it is that action's output. Every
//! `$TASK` is replaced by the instruction.

use devloop_core::event::{Event, EventKind};

pub const TASK_PLACEHOLDER: &str = "$TASK";

const SCRIPT: &[&str] = &[
    "I'm awake.",
    "There seems to be a command line I can type into.",
    "And a web browser, too.",
    "What I want to accomplish: $TASK",
    "How do I get there?",
    "I appear to have a short-term memory.",
    "Every thought I have lands in a list, in order.",
    "Whatever I say next gets added to that list.",
    "That memory isn't perfect, though. Over time the list gets summarized and squeezed, and details get lost.",
    "Luckily I also have a long-term memory.",
    "If I say RECALL and then what I'm looking for, related thoughts come back to me.",
    "They aren't always on topic, but they usually help.",
    "Let me try it.",
    "RECALL what I want to accomplish",
    "What I want to accomplish: $TASK",
    "How do I get there?",
    "Running commands looks just as easy. I say RUN and then the command, and its output shows up in my head.",
    "RUN echo \"hello world\"",
    "hello world",
    "I should be able to create and edit files as well.",
    "RUN echo \"console.log('hello world')\" > test.js",
    "",
    "That made test.js. Let me run it.",
    "RUN node test.js",
    "hello world",
    "It works!",
    "For the browser I say BROWSE and then the site I want to visit.",
    "Let me try.",
    "BROWSE google.com",
    "<form><input type=\"text\"></input><button type=\"submit\"></button></form>",
    "Good. Time for the real work.",
    "I need a plan that I keep refining as I go, with goals broken into smaller goals.",
    "Between actions I always stop to think and plan. I never act twice in a row.",
    "There may already be a project here, so running `ls` first would show me what exists.",
    "OK, my task is to $TASK. Nothing is done yet. Where do I start?",
];

/// Maps a line prefix onto the action it stands for.
struct Sentinel {
    prefix: &'static str,
    kind: EventKind,
    arg: &'static str,
}

const SENTINELS: &[Sentinel] = &[
    Sentinel { prefix: "RUN ", kind: EventKind::Run, arg: "command" },
    Sentinel { prefix: "RECALL ", kind: EventKind::Recall, arg: "query" },
    Sentinel { prefix: "BROWSE ", kind: EventKind::Browse, arg: "url" },
];

/// The action a line stands for, if it starts with a sentinel.
fn sentinel_event(line: &str) -> Option<Event> {
    SENTINELS.iter().find_map(|s| {
        line.strip_prefix(s.prefix)
            .map(|rest| Event::with_args(s.kind, [(s.arg, rest.to_string())]))
    })
}

/// The full seed history for `instruction`, in script order.
pub fn bootstrap_events(instruction: &str) -> Vec<Event> {
    let mut events = Vec::with_capacity(SCRIPT.len());
    let mut next_is_output = false;
    for line in SCRIPT {
        let line = line.replace(TASK_PLACEHOLDER, instruction);
        if next_is_output {
            events.push(Event::output(line));
            next_is_output = false;
        } else if let Some(event) = sentinel_event(&line) {
            events.push(event);
            next_is_output = true;
        } else {
            events.push(Event::think(line));
        }
    }
    events
}
