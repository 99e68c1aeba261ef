// Callback data: "<kind>_<action token>" carried by inline buttons

use crate::api::CallbackQuery;
use lineup_core::domain::{Intent, IntentKind};

pub fn callback_data(kind: IntentKind, token: &str) -> String {
    format!("{}_{}", kind.as_str(), token)
}

/// Split on the first underscore so tokens may contain underscores themselves
pub fn parse_callback_data(data: &str) -> Option<(IntentKind, &str)> {
    let (kind, token) = data.split_once('_')?;
    if token.is_empty() {
        return None;
    }
    Some((kind.parse().ok()?, token))
}

/// Intent behind a button press, `None` for foreign or malformed data
pub fn intent_from(query: &CallbackQuery) -> Option<Intent> {
    let (kind, token) = parse_callback_data(query.data.as_deref()?)?;
    Some(Intent::new(kind, token, query.from.username.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::User;

    #[test]
    fn test_parse_callback_data() {
        assert_eq!(
            parse_callback_data("join_ALG"),
            Some((IntentKind::Join, "ALG"))
        );
        assert_eq!(
            parse_callback_data("leave_LIN_ALG"),
            Some((IntentKind::Leave, "LIN_ALG"))
        );
        assert_eq!(parse_callback_data("show_"), None);
        assert_eq!(parse_callback_data("kick_ALG"), None);
        assert_eq!(parse_callback_data("join"), None);
    }

    #[test]
    fn test_callback_data_matches_parser() {
        let data = callback_data(IntentKind::Show, "PHY");
        assert_eq!(data, "show_PHY");
        assert_eq!(parse_callback_data(&data), Some((IntentKind::Show, "PHY")));
    }

    #[test]
    fn test_intent_from_query() {
        let query = CallbackQuery {
            id: "1".to_string(),
            from: User {
                id: 7,
                is_bot: false,
                first_name: "Ivan".to_string(),
                username: None,
            },
            data: Some("join_ALG".to_string()),
        };
        let intent = intent_from(&query).unwrap();
        assert_eq!(intent.kind, IntentKind::Join);
        assert_eq!(intent.token, "ALG");
        assert_eq!(intent.username, None);
    }
}
