use crate::api::{Movie, MovieId};

use super::CatalogError;

/// Issued by [`DetailPanel::expand`]; hand it back with the fetched detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionToken {
    id: MovieId,
    seq: u64,
}

impl ExpansionToken {
    pub fn id(&self) -> &MovieId {
        &self.id
    }
}

/// What to render for one row.
#[derive(Debug, PartialEq)]
pub enum PanelView<'a> {
    Collapsed,
    Loading,
    Loaded(&'a Movie),
    Failed(&'a str),
}

#[derive(Debug)]
enum Slot {
    Loaded(Movie),
    Failed(String),
}

/// Which row is expanded and what has been loaded for it.
///
/// Only one row is expanded at a time. Detail results are accepted only for
/// the latest expansion of the row that is still expanded, so a slow answer
/// for one movie never lands under another. Whatever was loaded belongs to
/// the expanded row and goes away with it.
#[derive(Debug, Default)]
pub struct DetailPanel {
    expanded: Option<MovieId>,
    seq: u64,
    slot: Option<Slot>,
}

impl DetailPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expanded(&self) -> Option<&MovieId> {
        self.expanded.as_ref()
    }

    /// Expand `id`, collapsing any other row.
    pub fn expand(&mut self, id: MovieId) -> ExpansionToken {
        self.seq += 1;
        self.slot = None;
        self.expanded = Some(id.clone());
        ExpansionToken { id, seq: self.seq }
    }

    pub fn collapse(&mut self) {
        self.expanded = None;
        self.slot = None;
    }

    /// Expand `id`, or collapse it if it is already expanded. Returns a
    /// token only when a fetch is needed.
    pub fn toggle(&mut self, id: MovieId) -> Option<ExpansionToken> {
        if self.expanded.as_ref() == Some(&id) {
            self.collapse();
            None
        } else {
            Some(self.expand(id))
        }
    }

    /// Record a fetch result. Returns `false` when the result was dropped.
    pub fn resolve(&mut self, token: &ExpansionToken, result: Result<Movie, CatalogError>) -> bool {
        if token.seq != self.seq || self.expanded.as_ref() != Some(&token.id) {
            return false;
        }
        let slot = match result {
            Ok(movie) if movie.id == token.id => Slot::Loaded(movie),
            Ok(_) => return false,
            Err(e) => Slot::Failed(e.to_string()),
        };
        self.slot = Some(slot);
        true
    }

    pub fn view(&self, id: &MovieId) -> PanelView<'_> {
        if self.expanded.as_ref() != Some(id) {
            return PanelView::Collapsed;
        }
        match &self.slot {
            None => PanelView::Loading,
            Some(Slot::Loaded(movie)) => PanelView::Loaded(movie),
            Some(Slot::Failed(message)) => PanelView::Failed(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_late_result_for_previous_row_is_dropped() {
        let mut panel = DetailPanel::new();
        let a = panel.expand(MovieId::new("1"));
        let b = panel.expand(MovieId::new("2"));

        // B answers first, then A's slow response arrives
        assert!(panel.resolve(&b, Ok(fixtures::movie(2, "Brazil", 1985))));
        assert!(!panel.resolve(&a, Ok(fixtures::movie(1, "Alien", 1979))));

        match panel.view(&MovieId::new("2")) {
            PanelView::Loaded(movie) => assert_eq!(movie.title, "Brazil"),
            other => panic!("unexpected view: {:?}", other),
        }
        assert_eq!(panel.view(&MovieId::new("1")), PanelView::Collapsed);
    }

    #[test]
    fn test_mismatched_movie_is_rejected() {
        let mut panel = DetailPanel::new();
        let token = panel.expand(MovieId::new("1"));
        assert!(!panel.resolve(&token, Ok(fixtures::movie(2, "Brazil", 1985))));
        assert_eq!(panel.view(&MovieId::new("1")), PanelView::Loading);
    }

    #[test]
    fn test_toggle_and_failure() {
        let mut panel = DetailPanel::new();
        let token = panel.toggle(MovieId::new("3")).unwrap();
        assert!(panel.resolve(&token, Err(CatalogError::Transport("offline".to_string()))));
        assert!(matches!(panel.view(&MovieId::new("3")), PanelView::Failed(_)));

        assert!(panel.toggle(MovieId::new("3")).is_none());
        assert_eq!(panel.expanded(), None);
        assert_eq!(panel.view(&MovieId::new("3")), PanelView::Collapsed);
    }

    #[test]
    fn test_collapse_drops_loaded_detail() {
        let mut panel = DetailPanel::new();
        let token = panel.expand(MovieId::new("1"));
        assert!(panel.resolve(&token, Ok(fixtures::movie(1, "Alien", 1979))));
        assert!(panel.slot.is_some());

        panel.collapse();
        assert!(panel.slot.is_none());

        // Expanding again starts from scratch
        panel.expand(MovieId::new("1"));
        assert_eq!(panel.view(&MovieId::new("1")), PanelView::Loading);
    }

    #[test]
    fn test_re_expanding_same_row_ignores_older_token() {
        let mut panel = DetailPanel::new();
        let first = panel.expand(MovieId::new("1"));
        let second = panel.expand(MovieId::new("1"));
        assert!(!panel.resolve(&first, Ok(fixtures::movie(1, "Alien", 1979))));
        assert!(panel.resolve(&second, Ok(fixtures::movie(1, "Alien", 1979))));
    }
}
