//! Whitespace tokenizer for directed chat commands.

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// Verb plus positional argument tokens of one inbound command.
pub struct CommandTokens {
    pub verb: String,
    pub args: Vec<String>,
}

impl CommandTokens {
    pub fn is_empty(&self) -> bool {
        self.verb.is_empty()
    }

    /// Lowercased verb used for table matching.
    pub fn normalized_verb(&self) -> String {
        self.verb.to_lowercase()
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Joins every argument from `start` onward with single spaces.
    pub fn tail(&self, start: usize) -> String {
        self.args
            .get(start..)
            .map(|rest| rest.join(" "))
            .unwrap_or_default()
    }
}

/// Splits a raw command string on whitespace. Empty input yields an empty verb.
pub fn tokenize(raw: &str) -> CommandTokens {
    let mut pieces = raw.split_whitespace().map(ToOwned::to_owned);
    let Some(verb) = pieces.next() else {
        return CommandTokens::default();
    };
    CommandTokens {
        verb,
        args: pieces.collect(),
    }
}
