use serde::Serialize;

/// Message pushed to every relay client once per tick with the presses drained that tick.
#[derive(Debug, Serialize)]
pub struct ButtonsMessage<'a> {
    /// Event names in the order they were queued.
    pub buttons: Vec<&'a str>,
}

impl<'a> ButtonsMessage<'a> {
    /// Wrap the drained event names, returning `None` when nothing happened this tick.
    pub fn from_names(names: Vec<&'a str>) -> Option<Self> {
        (!names.is_empty()).then_some(Self { buttons: names })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_single_buttons_key() {
        let message = ButtonsMessage::from_names(vec!["player2", "correct"]).unwrap();
        assert_eq!(
            serde_json::to_string(&message).unwrap(),
            r#"{"buttons":["player2","correct"]}"#
        );
    }

    #[test]
    fn empty_tick_has_no_message() {
        assert!(ButtonsMessage::from_names(Vec::new()).is_none());
    }
}
