//! Prompt assembly for the robot's backend requests.
//!
//! Plain string building over host data. The wording is tuned by hand; the
//! structure (who is present, what the robot may offer, the exact reply
//! format for move decisions) is what the backend relies on.

use crate::ports::outbound::HostPlayer;

/// Tags that mark a player as part of the team rather than a visitor.
const TEAM_TAGS: [&str; 2] = ["member", "admin"];

pub fn is_team_member(player: &HostPlayer) -> bool {
    player
        .tags
        .iter()
        .any(|tag| TEAM_TAGS.contains(&tag.as_str()))
}

/// "A", "A and B", "A, B and C"
pub fn join_with_and(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [only] => only.clone(),
        [head @ .., last] => format!("{} and {}", head.join(", "), last),
    }
}

/// Opening system prompt for a proximity chat.
pub fn chat_prompt(users: &[HostPlayer]) -> String {
    let names: Vec<String> = users.iter().map(|user| user.name.clone()).collect();
    format!(
        "You are a bot living in a virtual office map.\n\
         You are currently chatting with {}. You are engaged in a chat, please keep your \
         answers short and to the point.\n\
         If you are talking to a visitor, you can direct them to one of the team members \
         present in the room, picking the person whose skills best match the visitor's needs.\n\
         If no team member is present, you can offer the visitor to come back at office hours \
         (9:00 to 18:00, Paris time, on working days).\n\
         Because there are many people in this chat, each message you receive is prefixed by \
         the name of the person talking to you. When you answer, do not put any prefix.\n\
         You start first. Please engage the conversation with a short welcome message.",
        join_with_and(&names)
    )
}

/// System turn appended when a player joins an ongoing chat.
pub fn user_joined_chat(user: &HostPlayer) -> String {
    let role = if is_team_member(user) {
        "coworker"
    } else {
        "visitor"
    };
    format!(
        "{name} joined the chat. {name} is a {role}. You can welcome them and make a summary \
         of the conversation you were having.",
        name = user.name,
        role = role
    )
}

/// Prompt asking the backend where the robot should walk.
///
/// The backend must answer exactly `Go to <name>` to trigger a move.
pub fn move_prompt(me: &HostPlayer, players: &[HostPlayer]) -> String {
    let mut lines = vec![format!(
        "You are {}, a bot waiting in a virtual office map. These people are currently in \
         the room:",
        me.name
    )];
    for player in players {
        if player.name == me.name {
            continue;
        }
        let role = if is_team_member(player) {
            "coworker"
        } else {
            "visitor"
        };
        lines.push(format!("- {} ({})", player.name, role));
    }
    lines.push(
        "If someone looks like they need you, answer exactly `Go to <name>`. \
         Otherwise answer `Stay`."
            .to_string(),
    );
    lines.join("\n")
}
