pub const TRANSCRIPT_PROMPT: &str = "binexplorer> ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub command: String,
    pub result: String,
}

/// Append-only console history. Entries are never edited or removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn append(&mut self, command: impl Into<String>, result: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            command: command.into(),
            result: result.into(),
        });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Display lines for the newest entries, at most `line_limit` lines.
    pub fn render_lines(&self, line_limit: usize) -> Vec<String> {
        let mut lines = Vec::new();
        for entry in &self.entries {
            lines.push(format!("{TRANSCRIPT_PROMPT}{}", entry.command));
            lines.extend(
                entry
                    .result
                    .strip_suffix('\n')
                    .unwrap_or(entry.result.as_str())
                    .lines()
                    .map(ToOwned::to_owned),
            );
        }

        let limit = line_limit.max(1);
        if lines.len() > limit {
            lines.drain(..lines.len() - limit);
        }
        lines
    }
}
