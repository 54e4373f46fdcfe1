//! Parsing helpers for chat commands and configuration values.

use kcommon::UserId;
use kengine::Command;

pub const REFERRAL_PREFIX: &str = "ref_";
pub const REMOVE_BACKGROUND_MODEL: &str = "remove-background";
pub const UPSCALE_MODEL: &str = "recraft-upscaler";

/// Extracts the referrer from a `/start` deep-link payload such as `ref_42`.
pub fn parse_start_payload(payload: &str) -> Option<UserId> {
    payload
        .trim()
        .strip_prefix(REFERRAL_PREFIX)
        .and_then(|id| id.parse().ok())
}

/// Parses a comma separated list of user ids. Blank entries are skipped.
pub fn parse_admin_ids(raw: &str) -> Option<Vec<UserId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.parse().ok())
        .collect()
}

/// Maps a slash command to an engine command. Returns `None` for plain text
/// and unknown commands.
pub fn parse_command(text: &str) -> Option<Command> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;
    let (word, argument) = match rest.split_once(char::is_whitespace) {
        Some((word, argument)) => (word, argument.trim()),
        None => (rest, ""),
    };
    // Group chats address commands as `/img@some_bot`.
    let word = word.split('@').next().unwrap_or(word);

    let command = match word.to_ascii_lowercase().as_str() {
        "start" => Command::Start {
            referral: parse_start_payload(argument),
        },
        "img" => Command::Images,
        "vids" => Command::Videos,
        "chat" => Command::Chat,
        "prompt" => Command::Prompt,
        "exchange" => Command::Exchange,
        "profile" => Command::Profile,
        "lang" => Command::Language,
        "cancel" => Command::Cancel,
        "transform" if !argument.is_empty() => Command::Transform {
            model_id: argument.to_string(),
        },
        "removebg" => Command::Transform {
            model_id: REMOVE_BACKGROUND_MODEL.to_string(),
        },
        "upscale" => Command::Transform {
            model_id: UPSCALE_MODEL.to_string(),
        },
        _ => return None,
    };
    Some(command)
}

#[cfg(test)]
mod tests {
    use kcommon::UserId;
    use kengine::Command;

    use super::{parse_admin_ids, parse_command, parse_start_payload};

    #[test]
    fn start_payload_accepts_only_referral_links() {
        assert_eq!(parse_start_payload("ref_42"), Some(UserId::new(42)));
        assert_eq!(parse_start_payload(" ref_7 "), Some(UserId::new(7)));
        assert_eq!(parse_start_payload("ref_"), None);
        assert_eq!(parse_start_payload("promo_42"), None);
        assert_eq!(parse_start_payload(""), None);
    }

    #[test]
    fn admin_ids_parse_as_a_list() {
        assert_eq!(
            parse_admin_ids("1, 2,,3"),
            Some(vec![UserId::new(1), UserId::new(2), UserId::new(3)])
        );
        assert_eq!(parse_admin_ids(""), Some(Vec::new()));
        assert_eq!(parse_admin_ids("1,bob"), None);
    }

    #[test]
    fn commands_map_to_engine_commands() {
        assert_eq!(
            parse_command("/start ref_9"),
            Some(Command::Start {
                referral: Some(UserId::new(9))
            })
        );
        assert_eq!(
            parse_command("/start"),
            Some(Command::Start { referral: None })
        );
        assert_eq!(parse_command("/img"), Some(Command::Images));
        assert_eq!(parse_command("/vids@kiln_bot"), Some(Command::Videos));
        assert_eq!(parse_command("/CANCEL"), Some(Command::Cancel));
        assert_eq!(parse_command("/lang"), Some(Command::Language));
        assert_eq!(
            parse_command("/transform flux-kontext"),
            Some(Command::Transform {
                model_id: "flux-kontext".to_string()
            })
        );
    }

    #[test]
    fn utility_aliases_resolve_to_fixed_models() {
        assert_eq!(
            parse_command("/removebg"),
            Some(Command::Transform {
                model_id: "remove-background".to_string()
            })
        );
        assert_eq!(
            parse_command("/upscale"),
            Some(Command::Transform {
                model_id: "recraft-upscaler".to_string()
            })
        );
    }

    #[test]
    fn plain_text_and_unknown_commands_are_not_commands() {
        assert_eq!(parse_command("a castle at dusk"), None);
        assert_eq!(parse_command("/transform"), None);
        assert_eq!(parse_command("/teleport"), None);
        assert_eq!(parse_command("/"), None);
    }
}
