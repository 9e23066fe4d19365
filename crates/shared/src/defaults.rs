//! Built-in templates. These are rebuilt on every call so callers always get
//! their own copy.

use crate::domain::{Pool, RotatorSlot, Template, TemplateConfig, TemplateId, DEFAULT_SPEED};

pub const OVERWATCH_TEMPLATE_ID: &str = "default-ow-uuid";
pub const WEEKEND_TEMPLATE_ID: &str = "default-weekend-uuid";

const OVERWATCH_HEROES: &[&str] = &[
    "Doomfist", "D.Va", "Hazard", "Junker Queen", "Mauga", "Orisa", "Ramattra",
    "Reinhardt", "Roadhog", "Sigma", "Winston", "Wrecking Ball", "Zarya", "Ashe",
    "Bastion", "Cassidy", "Echo", "Freja", "Genji", "Hanzo", "Junkrat", "Mei",
    "Pharah", "Reaper", "Sojourn", "Soldier: 76", "Sombra", "Symmetra",
    "Torbjorn", "Tracer", "Venture", "Widowmaker", "Ana", "Baptiste", "Brigitte",
    "Illari", "Juno", "Kiriko", "Lifeweaver", "Lucio", "Mercy", "Moira", "Zenyatta",
];

pub const OVERWATCH_LOCATION: &str = "If you were dropped into Overwatch, your";

pub const OVERWATCH_SLOT_LABELS: [&str; 4] = ["Father is", "Mother is", "Partner is", "Child is"];

pub fn overwatch_pool() -> Pool {
    Pool::new(OVERWATCH_HEROES.iter().copied())
}

pub fn overwatch_template() -> Template {
    Template {
        id: TemplateId::new(OVERWATCH_TEMPLATE_ID),
        name: "Overwatch Fate Rotator".to_string(),
        is_default: true,
        is_shared_pool: true,
        config: TemplateConfig {
            location_text: OVERWATCH_LOCATION.to_string(),
            speed: i64::from(DEFAULT_SPEED),
            shared_pool: overwatch_pool(),
            rotators: OVERWATCH_SLOT_LABELS
                .iter()
                .enumerate()
                .map(|(index, label)| RotatorSlot::new(index as i64, *label))
                .collect(),
        },
    }
}

pub fn weekend_template() -> Template {
    Template {
        id: TemplateId::new(WEEKEND_TEMPLATE_ID),
        name: "Weekend Planner".to_string(),
        is_default: true,
        is_shared_pool: false,
        config: TemplateConfig {
            location_text: "This weekend you will".to_string(),
            speed: 20,
            shared_pool: Pool::default(),
            rotators: vec![
                RotatorSlot::new(0, "Eat").with_pool(Pool::new([
                    "Ramen", "Tacos", "Pizza", "Curry", "Dumplings", "Salad",
                ])),
                RotatorSlot::new(1, "Go to").with_pool(Pool::new([
                    "the park", "a museum", "the beach", "a concert", "the cinema",
                ])),
                RotatorSlot::new(2, "With").with_pool(Pool::new([
                    "family", "friends", "a colleague", "nobody",
                ])),
            ],
        },
    }
}

/// Canonical defaults in display order.
pub fn default_templates() -> Vec<Template> {
    vec![overwatch_template(), weekend_template()]
}

/// Config given to a freshly created custom template.
pub fn starter_config() -> TemplateConfig {
    TemplateConfig {
        location_text: "My scenario".to_string(),
        speed: i64::from(DEFAULT_SPEED),
        shared_pool: Pool::new(["Item A", "Item B", "Item C"]),
        rotators: vec![RotatorSlot::new(0, "Slot 1")],
    }
}
