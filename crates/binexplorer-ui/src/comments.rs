use binexplorer_core::StatementComment;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentSection {
    pub function: String,
    pub comments: Vec<StatementComment>,
    pub expanded: bool,
}

/// Sidebar listing of statement comments for the mounted function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentPanel {
    sections: Vec<CommentSection>,
}

impl CommentPanel {
    /// Replaces whatever is displayed with one expanded section for `function`.
    pub fn set_comments(&mut self, function: &str, comments: Vec<StatementComment>) {
        self.sections = vec![CommentSection {
            function: function.to_owned(),
            comments,
            expanded: true,
        }];
    }

    /// Appends to the mounted section for `function`. No section, no effect.
    pub fn add_comment(&mut self, function: &str, address: &str, text: &str) -> bool {
        let Some(section) = self.section_mut(function) else {
            tracing::debug!(function, address, "no comment section mounted; comment dropped");
            return false;
        };
        section.comments.push(StatementComment {
            address: address.to_owned(),
            text: text.to_owned(),
        });
        true
    }

    pub fn toggle_section(&mut self, function: &str) -> Option<bool> {
        let section = self.section_mut(function)?;
        section.expanded = !section.expanded;
        Some(section.expanded)
    }

    pub fn sections(&self) -> &[CommentSection] {
        &self.sections
    }

    pub fn section(&self, function: &str) -> Option<&CommentSection> {
        self.sections
            .iter()
            .find(|section| section.function == function)
    }

    fn section_mut(&mut self, function: &str) -> Option<&mut CommentSection> {
        self.sections
            .iter_mut()
            .find(|section| section.function == function)
    }
}
