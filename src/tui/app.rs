//! Dialog state for the terminal prompts.
//!
//! One `App` drives one dialog: either the cost confirmation shown before a
//! suggestion request, or the checklist of suggested tags.

use crate::cost::CostPreview;

/// Which dialog is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    ConfirmCost,
    ReviewTags,
}

/// How the user closed the dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Confirmed,
    Cancelled,
}

/// State of a single dialog.
#[derive(Debug, Clone)]
pub struct App {
    kind: DialogKind,
    /// Body text for the cost confirmation.
    message: String,
    warning: bool,
    tags: Vec<String>,
    accepted: Vec<bool>,
    selected_index: Option<usize>,
    decision: Option<Decision>,
}

impl App {
    /// Creates the cost confirmation dialog for `preview`.
    pub fn confirm_cost(preview: &CostPreview) -> Self {
        Self {
            kind: DialogKind::ConfirmCost,
            message: preview.to_string(),
            warning: preview.exceeds_context(),
            tags: Vec::new(),
            accepted: Vec::new(),
            selected_index: None,
            decision: None,
        }
    }

    /// Creates the review dialog. Every tag starts out accepted and the
    /// first one is selected.
    ///
    /// # Examples
    ///
    /// ```
    /// use autotag::tui::App;
    ///
    /// let app = App::review_tags(&["#rust".to_string(), "#cli".to_string()]);
    /// assert_eq!(app.selected_index(), Some(0));
    /// assert_eq!(app.accepted_tags(), vec!["#rust", "#cli"]);
    /// ```
    pub fn review_tags(tags: &[String]) -> Self {
        Self {
            kind: DialogKind::ReviewTags,
            message: String::new(),
            warning: false,
            tags: tags.to_vec(),
            accepted: vec![true; tags.len()],
            selected_index: if tags.is_empty() { None } else { Some(0) },
            decision: None,
        }
    }

    pub fn kind(&self) -> DialogKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the cost preview carries a context window warning.
    pub fn has_warning(&self) -> bool {
        self.warning
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn is_accepted(&self, index: usize) -> bool {
        self.accepted.get(index).copied().unwrap_or(false)
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn decision(&self) -> Option<Decision> {
        self.decision
    }

    /// Moves the selection down, wrapping to the first tag.
    ///
    /// # Examples
    ///
    /// ```
    /// use autotag::tui::App;
    ///
    /// let mut app = App::review_tags(&["a".to_string(), "b".to_string()]);
    /// app.select_next();
    /// assert_eq!(app.selected_index(), Some(1));
    /// app.select_next();
    /// assert_eq!(app.selected_index(), Some(0));
    /// ```
    pub fn select_next(&mut self) {
        if self.tags.is_empty() {
            self.selected_index = None;
            return;
        }

        self.selected_index = Some(match self.selected_index {
            None => 0,
            Some(i) if i + 1 >= self.tags.len() => 0,
            Some(i) => i + 1,
        });
    }

    /// Moves the selection up, wrapping to the last tag.
    pub fn select_previous(&mut self) {
        if self.tags.is_empty() {
            self.selected_index = None;
            return;
        }

        self.selected_index = Some(match self.selected_index {
            None | Some(0) => self.tags.len() - 1,
            Some(i) => i - 1,
        });
    }

    /// Flips the accepted flag of the selected tag.
    pub fn toggle_selected(&mut self) {
        if let Some(i) = self.selected_index
            && let Some(flag) = self.accepted.get_mut(i)
        {
            *flag = !*flag;
        }
    }

    pub fn accept_all(&mut self) {
        self.accepted.iter_mut().for_each(|flag| *flag = true);
    }

    pub fn reject_all(&mut self) {
        self.accepted.iter_mut().for_each(|flag| *flag = false);
    }

    pub fn confirm(&mut self) {
        self.decision = Some(Decision::Confirmed);
    }

    pub fn cancel(&mut self) {
        self.decision = Some(Decision::Cancelled);
    }

    /// Accepted tags in their original order.
    pub fn accepted_tags(&self) -> Vec<String> {
        self.tags
            .iter()
            .zip(&self.accepted)
            .filter(|(_, accepted)| **accepted)
            .map(|(tag, _)| tag.clone())
            .collect()
    }

    /// What the dialog resolved to once closed.
    ///
    /// A cancelled review keeps no tags.
    pub fn reviewed_tags(&self) -> Vec<String> {
        match self.decision {
            Some(Decision::Confirmed) => self.accepted_tags(),
            Some(Decision::Cancelled) | None => Vec::new(),
        }
    }

    /// Whether the cost dialog was confirmed.
    pub fn cost_confirmed(&self) -> bool {
        self.decision == Some(Decision::Confirmed)
    }
}
