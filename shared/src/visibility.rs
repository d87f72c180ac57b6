use serde::{Deserialize, Serialize};

/// Focus state of a team or event marker. `Visible` means its edges are
/// being shown because of a hover or tap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    Hidden,
    Visible,
}

impl Visibility {
    pub fn is_visible(self) -> bool {
        self == Visibility::Visible
    }

    pub fn toggled(self) -> Self {
        match self {
            Visibility::Hidden => Visibility::Visible,
            Visibility::Visible => Visibility::Hidden,
        }
    }
}

impl From<bool> for Visibility {
    fn from(visible: bool) -> Self {
        if visible {
            Visibility::Visible
        } else {
            Visibility::Hidden
        }
    }
}

/// Marker groups with their own show/hide switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Teams,
    Events,
    Championships,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Teams, Category::Events, Category::Championships];

    pub fn label(self) -> &'static str {
        match self {
            Category::Teams => "Teams",
            Category::Events => "Events",
            Category::Championships => "Championships",
        }
    }
}

/// One independent on/off switch per [`Category`]. All on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryToggles {
    pub teams: bool,
    pub events: bool,
    pub championships: bool,
}

impl Default for CategoryToggles {
    fn default() -> Self {
        Self {
            teams: true,
            events: true,
            championships: true,
        }
    }
}

impl CategoryToggles {
    pub fn is_on(&self, category: Category) -> bool {
        match category {
            Category::Teams => self.teams,
            Category::Events => self.events,
            Category::Championships => self.championships,
        }
    }

    /// Returns `true` when the switch actually changed.
    pub fn set(&mut self, category: Category, on: bool) -> bool {
        let slot = match category {
            Category::Teams => &mut self.teams,
            Category::Events => &mut self.events,
            Category::Championships => &mut self.championships,
        };
        let changed = *slot != on;
        *slot = on;
        changed
    }
}

/// How pointer input drives marker focus, chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionMode {
    /// Desktop: hover shows edges, click opens the team/event page.
    Hover,
    /// Touch: a tap toggles a marker's edges on and off.
    TapToggle,
}

impl InteractionMode {
    /// `can_hover` is the result of the `(any-hover: hover)` media query.
    pub fn detect(can_hover: bool) -> Self {
        if can_hover {
            InteractionMode::Hover
        } else {
            InteractionMode::TapToggle
        }
    }
}
