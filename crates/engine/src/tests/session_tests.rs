use super::*;
use crate::{ValuePicker, IDLE_VALUE};
use shared::{
    defaults::{OVERWATCH_TEMPLATE_ID, WEEKEND_TEMPLATE_ID},
    domain::{Pool, SlotId},
    records::V2_STORAGE_KEY,
};
use std::{
    sync::Mutex,
    time::Duration,
};
use storage::{KeyValueStore, MemoryStore};

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<(String, bool)>>,
}

impl RecordingNotifier {
    fn last(&self) -> Option<(String, bool)> {
        self.messages.lock().expect("notifier lock").last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, is_error: bool) {
        self.messages
            .lock()
            .expect("notifier lock")
            .push((message.to_string(), is_error));
    }
}

/// Mirrors what a screen shows: one cell per slot.
#[derive(Default)]
struct Board {
    cells: Mutex<Vec<(SlotId, String)>>,
}

impl Board {
    fn cells(&self) -> Vec<(SlotId, String)> {
        self.cells.lock().expect("board lock").clone()
    }
}

impl DisplaySurface for Board {
    fn has_slot(&self, slot_id: SlotId) -> bool {
        self.cells
            .lock()
            .expect("board lock")
            .iter()
            .any(|(id, _)| *id == slot_id)
    }

    fn show(&self, slot_id: SlotId, value: &str) {
        let mut cells = self.cells.lock().expect("board lock");
        if let Some(cell) = cells.iter_mut().find(|(id, _)| *id == slot_id) {
            cell.1 = value.to_string();
        }
    }

    fn populate(&self, settings: &CurrentSettings) {
        *self.cells.lock().expect("board lock") = settings
            .config
            .rotators
            .iter()
            .map(|slot| (slot.id, IDLE_VALUE.to_string()))
            .collect();
    }
}

struct Fixture {
    kv: MemoryStore,
    notifier: Arc<RecordingNotifier>,
    board: Arc<Board>,
    session: Session,
}

fn open() -> Fixture {
    open_over(MemoryStore::new())
}

fn open_over(kv: MemoryStore) -> Fixture {
    let notifier = Arc::new(RecordingNotifier::default());
    let board = Arc::new(Board::default());
    let store = TemplateStore::new(Arc::new(kv.clone()), notifier.clone());
    let engine = RotationEngine::with_picker(board.clone(), ValuePicker::with_seed(5));
    let session = Session::with_engine(store, board.clone(), engine);
    Fixture {
        kv,
        notifier,
        board,
        session,
    }
}

fn stored(kv: &MemoryStore) -> AppData {
    let raw = kv.get(V2_STORAGE_KEY).expect("read").expect("record");
    serde_json::from_str(&raw).expect("parse")
}

fn overwatch() -> TemplateId {
    TemplateId::new(OVERWATCH_TEMPLATE_ID)
}

#[test]
fn open_selects_active_template_and_populates_display() {
    let fixture = open();

    assert_eq!(fixture.session.active_template().map(|t| &t.id), Some(&overwatch()));
    let settings = fixture.session.current_settings();
    assert!(settings.is_shared_pool);
    assert_eq!(settings.config.rotators.len(), 4);
    let cells = fixture.board.cells();
    assert_eq!(cells.len(), 4);
    assert!(cells.iter().all(|(_, value)| value == IDLE_VALUE));
}

#[test]
fn load_template_switches_settings_and_clears_history() {
    let mut fixture = open();
    fixture.session.engine().tick();
    assert!(fixture.session.engine().last_shown(SlotId(0)).is_some());

    let weekend = TemplateId::new(WEEKEND_TEMPLATE_ID);
    fixture.session.load_template(&weekend).expect("load");

    assert_eq!(fixture.session.engine().last_shown(SlotId(0)), None);
    assert!(!fixture.session.current_settings().is_shared_pool);
    assert_eq!(fixture.board.cells().len(), 3);
    assert_eq!(stored(&fixture.kv).active_template_id, Some(weekend));
    assert!(!fixture.session.is_running());
}

#[test]
fn load_unknown_template_reports_error() {
    let mut fixture = open();
    let missing = TemplateId::new("custom-missing");

    let err = fixture.session.load_template(&missing).expect_err("missing");

    assert_eq!(err, TemplateError::NotFound(missing));
    assert_eq!(fixture.session.active_template().map(|t| &t.id), Some(&overwatch()));
    assert!(fixture.notifier.last().expect("notified").1);
}

#[test]
fn create_template_rejects_blank_name() {
    let mut fixture = open();

    let err = fixture.session.create_template("   ").expect_err("blank");

    assert_eq!(err, TemplateError::EmptyName);
    assert_eq!(fixture.session.templates().len(), 2);
    assert_eq!(
        fixture.notifier.last(),
        Some(("Name cannot be empty".to_string(), true))
    );
}

#[test]
fn create_template_persists_starter_config() {
    let mut fixture = open();

    let id = fixture.session.create_template(" Party ").expect("create");

    let created = fixture.session.data().template(&id).expect("created").clone();
    assert_eq!(created.name, "Party");
    assert!(!created.is_default);
    assert!(created.is_shared_pool);
    assert_eq!(created.config.rotators.len(), 1);
    assert_eq!(stored(&fixture.kv).templates.last(), Some(&created));
}

#[test]
fn edits_stay_in_draft_until_saved() {
    let mut fixture = open();
    let id = fixture.session.create_template("Mine").expect("create");

    let mut draft = fixture.session.begin_edit(&id).expect("edit");
    draft.name = "Renamed".to_string();
    draft.config.shared_pool = Pool::from_lines("one\ntwo\n\nthree");
    draft.add_slot("Slot 2");

    let persisted = fixture.session.data().template(&id).expect("template");
    assert_eq!(persisted.name, "Mine");
    assert_eq!(persisted.config.rotators.len(), 1);

    fixture.session.save_settings(draft).expect("save");

    let saved = fixture.session.data().template(&id).expect("template").clone();
    assert_eq!(saved.name, "Renamed");
    assert_eq!(saved.config.shared_pool, Pool::new(["one", "two", "three"]));
    assert_eq!(saved.config.rotators.len(), 2);
    assert_eq!(fixture.session.current_settings().config, saved.config);
    assert_eq!(stored(&fixture.kv).template(&id), Some(&saved));
    assert_eq!(fixture.board.cells().len(), 2);
    assert_eq!(
        fixture.notifier.last(),
        Some(("Settings saved".to_string(), false))
    );
}

#[test]
fn blank_name_on_save_becomes_untitled() {
    let mut fixture = open();
    let id = fixture.session.create_template("Mine").expect("create");
    let mut draft = fixture.session.begin_edit(&id).expect("edit");
    draft.name = "  ".to_string();

    fixture.session.save_settings(draft).expect("save");

    assert_eq!(
        fixture.session.data().template(&id).map(|t| t.name.as_str()),
        Some(UNTITLED_TEMPLATE_NAME)
    );
}

#[test]
fn default_templates_cannot_be_saved_or_deleted() {
    let mut fixture = open();
    let mut draft = fixture.session.begin_edit(&overwatch()).expect("edit");
    draft.config.shared_pool = Pool::new(["hacked"]);

    assert_eq!(
        fixture.session.save_settings(draft),
        Err(TemplateError::DefaultImmutable(overwatch()))
    );
    assert_eq!(
        fixture.session.delete_template(&overwatch()),
        Err(TemplateError::DefaultImmutable(overwatch()))
    );
    assert_ne!(
        fixture.session.data().template(&overwatch()).map(|t| &t.config.shared_pool),
        Some(&Pool::new(["hacked"]))
    );
}

#[test]
fn duplicate_copies_template_as_custom() {
    let mut fixture = open();
    let weekend = TemplateId::new(WEEKEND_TEMPLATE_ID);

    let copy_id = fixture
        .session
        .duplicate_template(&weekend, "Weekend (copy)")
        .expect("duplicate");

    let original = fixture.session.data().template(&weekend).expect("original").clone();
    let copy = fixture.session.data().template(&copy_id).expect("copy").clone();
    assert_ne!(copy.id, original.id);
    assert!(!copy.is_default);
    assert_eq!(copy.name, "Weekend (copy)");
    assert_eq!(copy.config, original.config);
    assert_eq!(copy.is_shared_pool, original.is_shared_pool);
    assert!(fixture.session.duplicate_template(&weekend, "").is_err());
}

#[test]
fn deleting_active_custom_template_falls_back_to_first_default() {
    let mut fixture = open();
    let id = fixture.session.create_template("Temporary").expect("create");
    fixture.session.load_template(&id).expect("load");

    fixture.session.delete_template(&id).expect("delete");

    assert!(fixture.session.data().template(&id).is_none());
    assert_eq!(fixture.session.active_template().map(|t| &t.id), Some(&overwatch()));
    assert_eq!(fixture.session.current_settings().config.rotators.len(), 4);
    assert_eq!(stored(&fixture.kv).active_template_id, Some(overwatch()));
    assert_eq!(
        fixture.notifier.last(),
        Some(("Template \"Temporary\" deleted".to_string(), false))
    );
}

#[test]
fn reopening_keeps_custom_templates_and_active_id() {
    let kv = MemoryStore::new();
    let id = {
        let mut fixture = open_over(kv.clone());
        let id = fixture.session.create_template("Keep me").expect("create");
        fixture.session.load_template(&id).expect("load");
        id
    };

    let reopened = open_over(kv);
    assert_eq!(reopened.session.active_template().map(|t| &t.id), Some(&id));
    assert_eq!(reopened.session.templates().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn session_drives_rotation_on_the_board() {
    let fixture = open();

    fixture.session.start().expect("start");
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(
        fixture.session.toggle_pause().expect("pause"),
        EngineState::Stopped
    );

    let cells = fixture.board.cells();
    assert!(cells.iter().all(|(_, value)| value != IDLE_VALUE));

    fixture.session.restart();
    assert!(fixture
        .board
        .cells()
        .iter()
        .all(|(_, value)| value == IDLE_VALUE));
    assert!(!fixture.session.is_running());
}

#[tokio::test(start_paused = true)]
async fn editing_another_template_stops_and_clears_history() {
    let mut fixture = open();
    fixture.session.start().expect("start");
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(fixture.session.engine().last_shown(SlotId(0)).is_some());

    let weekend = TemplateId::new(WEEKEND_TEMPLATE_ID);
    fixture.session.begin_edit(&weekend).expect("edit");

    assert!(!fixture.session.is_running());
    assert_eq!(fixture.session.engine().last_shown(SlotId(0)), None);
    let cells = fixture.board.cells();
    assert_eq!(cells.len(), 3);
    assert!(cells.iter().all(|(_, value)| value == IDLE_VALUE));
}

#[tokio::test(start_paused = true)]
async fn editing_the_active_template_keeps_the_rotation() {
    let mut fixture = open();
    fixture.session.start().expect("start");

    fixture.session.begin_edit(&overwatch()).expect("edit");

    assert!(fixture.session.is_running());
    fixture.session.stop();
}

#[tokio::test(start_paused = true)]
async fn saving_settings_stops_a_running_rotation() {
    let mut fixture = open();
    let id = fixture.session.create_template("Live").expect("create");
    let draft = fixture.session.begin_edit(&id).expect("edit");
    fixture.session.start().expect("start");
    assert!(fixture.session.is_running());

    fixture.session.save_settings(draft).expect("save");
    assert!(!fixture.session.is_running());
}
