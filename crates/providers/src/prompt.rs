//! Prompt text for the action and summary requests.

use devloop_core::{BackgroundProcess, Conversation, EventKind, TASK_RESTATEMENT};

const ACTION_TEMPLATE: &str = r#"You are a careful software agent. Your job is to {task}.
Do exactly that job and nothing beyond it.

Below is your internal monologue as a JSON array, oldest entry first:
```json
{monologue}
```

The last entry is your most recent thought. Pick up from there and decide
what comes next. Reply with a single JSON object with two keys:
* `action`: one of the actions listed below
* `args`: an object holding the arguments for that action

Actions:
* `read` - read a file. Args:
  * `path` - file to read
* `write` - write a file. Args:
  * `path` - file to write
  * `contents` - text to write
* `run` - run a shell command. Args:
  * `command` - the command line
  * `background` - set to true to leave the command running (a server, a watcher) while you keep working. You will not see its output. Do not append `&`.
* `kill` - stop a background command. Args:
  * `id` - the numeric id of the background command
* `browse` - fetch a web page. Args:
  * `url` - the address to fetch
* `recall` - search your long-term memory. Args:
  * `query` - what to look for
* `think` - plan, set goals, or note an observation. Args:
  * `thought` - the thought
* `finish` - stop working. Only use this once the job is done and checked.

{background}

Think between every read, write, run, browse and recall. Never take two
actions back to back. If your last few entries are all thoughts, act.

Environment notes:
* commands run through `sh -c` from the workspace root, and `cd` does not persist between commands
* avoid interactive commands and commands that never exit; run those in the background instead

Reply with JSON and nothing else.

{hint}
"#;

const SUMMARY_TEMPLATE: &str = r#"The JSON array below is the internal monologue of an automated agent.
Entries are thoughts, actions the agent took, and the output of those
actions.
```json
{monologue}
```
Return a shorter JSON array that summarizes it. You may shorten single
entries or merge related entries into one description. Keep names, paths,
commands, errors and anything else worth searching for later.

Reply with a JSON object holding one key, `new_monologue`: the new array.
Every entry needs an `action` key and an `args` key. Use action `summarize`
with `args.summary` for a summary, or copy an entry's action and args
unchanged.
"#;

pub const HINT_JUST_STARTED: &str = "You're just getting started! What should you do first?";
pub const HINT_THINKING_A_LOT: &str =
    "You've been thinking a lot lately. Maybe it's time to take action?";
pub const HINT_LAST_COMMAND_FAILED: &str =
    "Looks like that last command failed. Maybe you need to fix it, or try something else.";

/// A nudge derived from the latest event.
pub fn hint_for(conversation: Conversation<'_>) -> &'static str {
    let Some(latest) = conversation.last() else {
        return "";
    };
    match latest.kind {
        EventKind::Think => {
            let restating_task = latest
                .arg_str("thought")
                .is_some_and(|t| t.starts_with(TASK_RESTATEMENT));
            if restating_task {
                HINT_JUST_STARTED
            } else {
                HINT_THINKING_A_LOT
            }
        }
        EventKind::Error => HINT_LAST_COMMAND_FAILED,
        _ => "",
    }
}

/// Lists running background commands, or nothing when there are none.
pub fn background_message(processes: &[BackgroundProcess]) -> String {
    if processes.is_empty() {
        return String::new();
    }
    let mut message = String::from("These commands are running in the background:");
    for process in processes {
        message.push_str(&format!("\n`{}`: {}", process.id, process.command));
    }
    message.push_str("\nStop any of them with a `kill` action carrying its numeric `id`.");
    message
}

/// Substitute `{slot}` placeholders in a single pass, so text that lands in
/// one slot is never scanned for another.
fn fill(template: &str, slots: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let slot = slots
            .iter()
            .find(|(name, _)| tail.starts_with(name) && tail[name.len()..].starts_with('}'));
        match slot {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn action_prompt(
    task: &str,
    conversation: Conversation<'_>,
    background_processes: &[BackgroundProcess],
) -> String {
    let monologue = conversation.to_json().to_string();
    let background = background_message(background_processes);
    fill(
        ACTION_TEMPLATE,
        &[
            ("task", task),
            ("monologue", &monologue),
            ("background", &background),
            ("hint", hint_for(conversation)),
        ],
    )
}

pub fn summary_prompt(conversation: Conversation<'_>) -> String {
    let monologue = serde_json::json!({ "old_monologue": conversation.to_json() }).to_string();
    fill(SUMMARY_TEMPLATE, &[("monologue", &monologue)])
}
