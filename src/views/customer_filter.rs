//! Customer list filtering.
//!
//! Pure view-model over already-rendered customer cards: no I/O, no shared
//! mutable state. The caller owns a [`ListFilter`] and re-evaluates
//! visibility whenever it changes.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Quiet period after the last keystroke before the list is re-filtered.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(150);

/// One rendered customer card and the data attributes it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerCard {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,

    /// Not part of the "recent" set, so hidden until "show all"
    pub initially_hidden: bool,
}

impl CustomerCard {
    /// Case-insensitive substring match on name or phone.
    pub fn matches(&self, needle_lower: &str) -> bool {
        self.name.to_lowercase().contains(needle_lower)
            || self
                .phone
                .as_deref()
                .is_some_and(|p| p.to_lowercase().contains(needle_lower))
    }
}

/// Free-text filter plus the recent/all toggle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListFilter {
    #[serde(default, rename = "q")]
    pub text: String,
    #[serde(default)]
    pub show_all: bool,
}

impl ListFilter {
    fn needle(&self) -> Option<String> {
        let trimmed = self.text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
    }

    /// Visibility of each card, in card order.
    ///
    /// Empty text: cards follow the toggle. Non-empty text: every card is
    /// matched and the toggle is ignored.
    pub fn visibility(&self, cards: &[CustomerCard]) -> Vec<bool> {
        match self.needle() {
            None => cards
                .iter()
                .map(|card| self.show_all || !card.initially_hidden)
                .collect(),
            Some(needle) => cards.iter().map(|card| card.matches(&needle)).collect(),
        }
    }
}

/// Placeholder shown when a search matches nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmptyState {
    pub visible: bool,
    pub message: String,
}

/// Customer list with its filter and the empty-state placeholder.
///
/// The placeholder is created on the first empty search and afterwards
/// only toggled.
#[derive(Debug, Clone)]
pub struct CustomerListView {
    cards: Vec<CustomerCard>,
    filter: ListFilter,
    visible: Vec<bool>,
    empty_state: Option<EmptyState>,
}

impl CustomerListView {
    pub fn new(cards: Vec<CustomerCard>) -> Self {
        let filter = ListFilter::default();
        let visible = filter.visibility(&cards);
        Self {
            cards,
            filter,
            visible,
            empty_state: None,
        }
    }

    pub fn cards(&self) -> &[CustomerCard] {
        &self.cards
    }

    pub fn filter(&self) -> &ListFilter {
        &self.filter
    }

    pub fn is_visible(&self, index: usize) -> bool {
        self.visible.get(index).copied().unwrap_or(false)
    }

    pub fn visible_count(&self) -> usize {
        self.visible.iter().filter(|v| **v).count()
    }

    pub fn empty_state(&self) -> Option<&EmptyState> {
        self.empty_state.as_ref()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.filter.text = text.into();
        self.refresh();
    }

    pub fn set_show_all(&mut self, show_all: bool) {
        self.filter.show_all = show_all;
        self.refresh();
    }

    pub fn apply(&mut self, filter: ListFilter) {
        self.filter = filter;
        self.refresh();
    }

    fn refresh(&mut self) {
        self.visible = self.filter.visibility(&self.cards);

        let query = self.filter.text.trim();
        let show_placeholder = !query.is_empty() && self.visible_count() == 0;

        if show_placeholder {
            let message = format!("No customers found matching \"{query}\"");
            match self.empty_state.as_mut() {
                Some(state) => {
                    state.visible = true;
                    state.message = message;
                }
                None => {
                    self.empty_state = Some(EmptyState {
                        visible: true,
                        message,
                    });
                }
            }
        } else if let Some(state) = self.empty_state.as_mut() {
            state.visible = false;
        }
    }
}

/// Debounces search input: text is released once no new input arrived for
/// [`SEARCH_DEBOUNCE`].
#[derive(Debug, Default)]
pub struct SearchDebounce {
    pending: Option<(String, Instant)>,
}

impl SearchDebounce {
    /// Record a keystroke; restarts the quiet period.
    pub fn input(&mut self, text: impl Into<String>, now: Instant) {
        self.pending = Some((text.into(), now));
    }

    /// Text to filter by, if the quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let ready = self
            .pending
            .as_ref()
            .is_some_and(|(_, at)| now.saturating_duration_since(*at) >= SEARCH_DEBOUNCE);
        if ready {
            self.pending.take().map(|(text, _)| text)
        } else {
            None
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Response of the card-list endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CardListing {
    pub query: String,
    pub show_all: bool,
    pub visible_count: usize,
    pub cards: Vec<CardVisibility>,
    pub empty_state: Option<EmptyState>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardVisibility {
    #[serde(flatten)]
    pub card: CustomerCard,
    pub visible: bool,
}

impl From<CustomerListView> for CardListing {
    fn from(view: CustomerListView) -> Self {
        let visible_count = view.visible_count();
        let CustomerListView {
            cards,
            filter,
            visible,
            empty_state,
        } = view;

        CardListing {
            query: filter.text,
            show_all: filter.show_all,
            visible_count,
            cards: cards
                .into_iter()
                .zip(visible)
                .map(|(card, visible)| CardVisibility { card, visible })
                .collect(),
            empty_state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(name: &str, phone: &str, initially_hidden: bool) -> CustomerCard {
        CustomerCard {
            id: Uuid::new_v4(),
            name: name.to_string(),
            phone: Some(phone.to_string()),
            initially_hidden,
        }
    }

    fn john() -> CustomerCard {
        card("John Doe", "5551234", true)
    }

    #[test]
    fn name_and_phone_each_match() {
        let mut view = CustomerListView::new(vec![john(), card("Mary Major", "5559876", false)]);

        view.set_text("john");
        assert!(view.is_visible(0));
        assert!(!view.is_visible(1));

        view.set_text("5551");
        assert!(view.is_visible(0));
        assert!(!view.is_visible(1));
    }

    #[test]
    fn match_ignores_case() {
        let mut view = CustomerListView::new(vec![john()]);
        view.set_text("DOE");
        assert!(view.is_visible(0));
    }

    #[test]
    fn no_match_shows_empty_state_with_query() {
        let mut view = CustomerListView::new(vec![john()]);
        view.set_text("xyz");

        assert!(!view.is_visible(0));
        let empty = view.empty_state().unwrap();
        assert!(empty.visible);
        assert_eq!(empty.message, "No customers found matching \"xyz\"");
    }

    #[test]
    fn empty_state_is_reused_and_hidden_again() {
        let mut view = CustomerListView::new(vec![john()]);
        view.set_text("xyz");
        view.set_text("john");
        assert!(!view.empty_state().unwrap().visible);

        view.set_text("qqq");
        let empty = view.empty_state().unwrap();
        assert!(empty.visible);
        assert!(empty.message.contains("qqq"));
    }

    #[test]
    fn toggle_controls_visibility_without_text() {
        let cards = vec![
            card("Recent One", "1", false),
            card("Older Two", "2", true),
            card("Recent Three", "3", false),
        ];
        let mut view = CustomerListView::new(cards);

        assert_eq!(view.visible_count(), 2);
        assert!(!view.is_visible(1));

        view.set_show_all(true);
        assert_eq!(view.visible_count(), 3);

        view.set_show_all(false);
        assert_eq!(view.visible_count(), 2);
    }

    #[test]
    fn search_overrides_the_toggle() {
        let mut view = CustomerListView::new(vec![card("Recent", "1", false), john()]);
        view.set_text("john");
        assert!(view.is_visible(1));
        assert!(!view.is_visible(0));

        // Clearing the text restores toggle-driven visibility
        view.set_text("");
        assert!(view.is_visible(0));
        assert!(!view.is_visible(1));
        assert!(view.empty_state().is_none());
    }

    #[test]
    fn whitespace_only_text_counts_as_empty() {
        let filter = ListFilter {
            text: "   ".to_string(),
            show_all: false,
        };
        assert_eq!(filter.visibility(&[john()]), vec![false]);
    }

    #[test]
    fn debounce_waits_for_quiet_period() {
        let start = Instant::now();
        let mut debounce = SearchDebounce::default();

        debounce.input("jo", start);
        debounce.input("joh", start + Duration::from_millis(100));
        assert_eq!(debounce.poll(start + Duration::from_millis(200)), None);

        assert_eq!(
            debounce.poll(start + Duration::from_millis(250)),
            Some("joh".to_string())
        );
        assert!(!debounce.is_pending());
        assert_eq!(debounce.poll(start + Duration::from_millis(500)), None);
    }

    #[test]
    fn listing_pairs_cards_with_visibility() {
        let mut view = CustomerListView::new(vec![john(), card("Mary", "2", false)]);
        view.apply(ListFilter {
            text: "mary".to_string(),
            show_all: false,
        });

        let listing = CardListing::from(view);
        assert_eq!(listing.visible_count, 1);
        assert!(!listing.cards[0].visible);
        assert!(listing.cards[1].visible);
        assert!(listing.empty_state.is_none());
    }
}
