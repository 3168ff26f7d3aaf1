/// Console scenario tests
///
/// Drives the listing controllers over an in-memory remote source and a
/// file-backed overlay in a temporary directory.
/// Run with: cargo test --test console_tests
use dragonball_admin::{
    AdminError, Character, Console, ConsoleConfig, CredentialDirectory, DomainController,
    EditTarget, Entry, FileKeyValueStore, KeyValueStore, LOCAL_ID_FLOOR, LoadOutcome, MemorySource, Origin,
    OverlayStore, PageMove, Planet, Record, Role, View,
};
use std::sync::Arc;
use tempfile::TempDir;

fn directory() -> CredentialDirectory {
    CredentialDirectory::with_accounts(&[
        ("admin", "admin123", Role::Admin),
        ("user", "user123", Role::User),
    ])
    .unwrap()
}

fn open_console(dir: &TempDir) -> (Console, Arc<dyn KeyValueStore>) {
    let storage: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::open(dir.path()).unwrap());
    let config = ConsoleConfig::new().data_dir(dir.path()).page_size(2);
    let console = Console::with_storage(config, storage.clone(), directory()).unwrap();
    (console, storage)
}

fn saiyans() -> MemorySource<Character> {
    MemorySource::new(vec![
        Character::named(1, "Goku").race("Saiyan").affiliation("Z Fighter"),
        Character::named(2, "Vegeta").race("Saiyan").affiliation("Z Fighter"),
        Character::named(3, "Piccolo").race("Namekian").affiliation("Z Fighter"),
        Character::named(4, "Freezer").race("Frieza Race").affiliation("Army of Frieza"),
        Character::named(5, "Zarbon").race("Frieza Race"),
    ])
}

fn stored_characters(storage: &Arc<dyn KeyValueStore>) -> Vec<Character> {
    match storage.get(Character::OVERLAY_KEY).unwrap() {
        Some(raw) => serde_json::from_str(&raw).unwrap(),
        None => Vec::new(),
    }
}

#[tokio::test]
async fn test_admin_creates_local_character() {
    let dir = TempDir::new().unwrap();
    let (mut console, storage) = open_console(&dir);
    console.session.login("admin", "admin123").unwrap();

    let source = saiyans();
    assert_eq!(console.characters.reload(&source).await, LoadOutcome::Applied);

    console.characters.begin_create(&console.session).unwrap();
    assert_eq!(console.characters.editing(), Some(&EditTarget::New));
    let entry = console
        .characters
        .save(
            &console.session,
            Character::named(0, "Test").race("Human").affiliation("Other"),
        )
        .unwrap();

    assert!(entry.is_local());
    assert!(entry.id() >= LOCAL_ID_FLOOR);
    assert!(console.characters.editing().is_none());

    let stored = stored_characters(&storage);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name, "Test");
    assert_eq!(stored[0].id, entry.id());

    let listed: Vec<u64> = console.characters.entries().iter().map(Entry::id).collect();
    assert_eq!(listed[0], entry.id());
    assert_eq!(listed.len(), 3);
}

#[tokio::test]
async fn test_created_records_survive_restart() {
    let dir = TempDir::new().unwrap();
    let id = {
        let (mut console, _) = open_console(&dir);
        console.session.login("admin", "admin123").unwrap();
        console
            .planets
            .create(&console.session, Planet::named(0, "New Namek"))
            .unwrap()
            .id()
    };

    let (console, _) = open_console(&dir);
    assert!(console.session.is_admin());
    assert_eq!(console.planets.overlay().len(), 1);
    let planet = console.planets.find(id).unwrap();
    assert_eq!(planet.origin(), Origin::Local);
    assert_eq!(planet.record().name, "New Namek");
}

#[tokio::test]
async fn test_deleting_remote_record_leaves_overlay_untouched() {
    let dir = TempDir::new().unwrap();
    let (mut console, storage) = open_console(&dir);
    console.session.login("admin", "admin123").unwrap();
    let local = console
        .characters
        .create(&console.session, Character::named(0, "Android 21"))
        .unwrap();
    let before = storage.get(Character::OVERLAY_KEY).unwrap();

    let source = saiyans();
    console.characters.reload(&source).await;
    let removed = console.characters.delete(&console.session, 1).unwrap();

    assert_eq!(removed.origin(), Origin::Remote);
    assert_eq!(storage.get(Character::OVERLAY_KEY).unwrap(), before);
    assert!(console.characters.find(1).is_none());
    assert!(console.characters.find(local.id()).is_some());

    // The next load brings the upstream record back.
    console.characters.reload(&source).await;
    assert!(console.characters.find(1).is_some());
}

#[tokio::test]
async fn test_deleting_local_record_rewrites_overlay() {
    let dir = TempDir::new().unwrap();
    let (mut console, storage) = open_console(&dir);
    console.session.login("admin", "admin123").unwrap();

    let keep = console
        .characters
        .create(&console.session, Character::named(0, "Cabba"))
        .unwrap();
    let gone = console
        .characters
        .create(&console.session, Character::named(0, "Caulifla"))
        .unwrap();

    console.characters.delete(&console.session, gone.id()).unwrap();

    let stored = stored_characters(&storage);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, keep.id());
}

#[tokio::test]
async fn test_overlay_record_shadows_remote_id() {
    let dir = TempDir::new().unwrap();
    let storage: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::open(dir.path()).unwrap());
    let mut overlay = OverlayStore::<Character>::open(storage).unwrap();
    overlay
        .create(Character::named(2, "Vegeta (local)").race("Human"))
        .unwrap();

    let mut listing = DomainController::new(overlay, 10);
    listing.reload(&saiyans()).await;

    let vegetas: Vec<Entry<Character>> = listing
        .entries()
        .into_iter()
        .filter(|entry| entry.id() == 2)
        .collect();
    assert_eq!(vegetas.len(), 1);
    assert_eq!(vegetas[0].origin(), Origin::Local);
    assert_eq!(vegetas[0].record().name, "Vegeta (local)");

    // The local Vegeta fails the race filter, so the remote one shows through.
    listing.set_filter("race", "Saiyan").unwrap();
    let entries = listing.entries();
    let ids: Vec<u64> = entries.iter().map(Entry::id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(entries[1].origin(), Origin::Remote);
    assert_eq!(entries[1].record().name, "Vegeta");
}

#[tokio::test]
async fn test_regular_user_cannot_mutate() {
    let dir = TempDir::new().unwrap();
    let (mut console, storage) = open_console(&dir);
    console.session.login("user", "user123").unwrap();
    console.characters.reload(&saiyans()).await;

    let create = console
        .characters
        .create(&console.session, Character::named(0, "Yamcha"));
    assert!(matches!(create, Err(AdminError::Forbidden(_))));
    assert!(matches!(
        console.characters.begin_edit(&console.session, 1),
        Err(AdminError::Forbidden(_))
    ));
    assert!(matches!(
        console.characters.delete(&console.session, 1),
        Err(AdminError::Forbidden(_))
    ));

    assert!(storage.get(Character::OVERLAY_KEY).unwrap().is_none());
    assert_eq!(console.characters.entries().len(), 2);
}

#[tokio::test]
async fn test_edit_remote_changes_listing_only() {
    let dir = TempDir::new().unwrap();
    let (mut console, storage) = open_console(&dir);
    console.session.login("admin", "admin123").unwrap();
    let source = saiyans();
    console.characters.reload(&source).await;

    let entry = console.characters.begin_edit(&console.session, 2).unwrap();
    let mut vegeta = entry.into_record();
    vegeta.set_field("ki", "54.000.000").unwrap();
    let saved = console.characters.save(&console.session, vegeta).unwrap();

    assert_eq!(saved.origin(), Origin::Remote);
    assert_eq!(console.characters.find(2).unwrap().record().ki, "54.000.000");
    assert!(storage.get(Character::OVERLAY_KEY).unwrap().is_none());

    console.characters.reload(&source).await;
    assert_eq!(console.characters.find(2).unwrap().record().ki, "");
}

#[tokio::test]
async fn test_invalid_save_keeps_form_open() {
    let dir = TempDir::new().unwrap();
    let (mut console, _) = open_console(&dir);
    console.session.login("admin", "admin123").unwrap();

    console.characters.begin_create(&console.session).unwrap();
    let result = console
        .characters
        .save(&console.session, Character::named(0, "   "));
    assert!(matches!(result, Err(AdminError::Validation(_))));
    assert_eq!(console.characters.editing(), Some(&EditTarget::New));

    console.characters.cancel_edit();
    assert!(console.characters.editing().is_none());
    assert!(console.characters.overlay().is_empty());
}

#[tokio::test]
async fn test_paging_and_filters_drive_requests() {
    let dir = TempDir::new().unwrap();
    let (mut console, _) = open_console(&dir);
    console.session.login("user", "user123").unwrap();
    let source = saiyans();

    console.characters.reload(&source).await;
    assert_eq!(console.characters.total_pages(), 3);
    assert!(console.characters.move_page(PageMove::Next));
    console.characters.reload(&source).await;
    let names: Vec<String> = console
        .characters
        .entries()
        .into_iter()
        .map(|entry| entry.into_record().name)
        .collect();
    assert_eq!(names, vec!["Piccolo", "Freezer"]);

    assert!(console.characters.set_filter("affiliation", "army").unwrap());
    assert_eq!(console.characters.page(), 1);
    assert!(!console.characters.pagination_visible());
    console.characters.reload(&source).await;

    let requests = source.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].page, 2);
    let last = &requests[2];
    assert_eq!(last.page, 1);
    assert_eq!(last.page_size, 2);
    let sent: Vec<String> = last
        .filters
        .active()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect();
    assert_eq!(sent, vec!["affiliation=army"]);
}

#[tokio::test]
async fn test_failed_load_reports_message() {
    let dir = TempDir::new().unwrap();
    let (mut console, _) = open_console(&dir);
    console.session.login("admin", "admin123").unwrap();
    let source = saiyans();
    source.set_failing(true);

    assert_eq!(console.characters.reload(&source).await, LoadOutcome::Failed);
    assert_eq!(
        console.characters.error(),
        Some("Failed to load characters. Please try again.")
    );
    assert!(console.characters.entries().is_empty());

    source.set_failing(false);
    assert_eq!(console.characters.reload(&source).await, LoadOutcome::Applied);
    assert!(console.characters.error().is_none());
}

#[tokio::test]
async fn test_out_of_order_responses_keep_latest() {
    let dir = TempDir::new().unwrap();
    let (mut console, _) = open_console(&dir);
    let source = saiyans();

    console.characters.set_filter("name", "go").unwrap();
    let slow = console.characters.prepare_load();
    console.characters.set_filter("name", "").unwrap();
    let fast = console.characters.prepare_load();

    let fast_page = dragonball_admin::RemoteSource::<Character>::fetch_page(
        &source,
        fast.page,
        fast.page_size,
        &fast.filters,
    )
    .await;
    let slow_page = dragonball_admin::RemoteSource::<Character>::fetch_page(
        &source,
        slow.page,
        slow.page_size,
        &slow.filters,
    )
    .await;

    assert_eq!(
        console.characters.apply_load(fast.ticket, fast_page),
        LoadOutcome::Applied
    );
    assert_eq!(
        console.characters.apply_load(slow.ticket, slow_page),
        LoadOutcome::Stale
    );
    assert!(!console.characters.is_loading());
    assert_eq!(console.characters.entries().len(), 2);
}

#[test]
fn test_malformed_overlay_blob_fails_to_open() {
    let dir = TempDir::new().unwrap();
    let storage: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::open(dir.path()).unwrap());
    storage.set(Planet::OVERLAY_KEY, "{not json").unwrap();

    let config = ConsoleConfig::new().data_dir(dir.path());
    let result = Console::with_storage(config, storage, directory());
    assert!(matches!(result, Err(AdminError::Persistence(_))));
}

#[test]
fn test_view_toggles() {
    let dir = TempDir::new().unwrap();
    let (mut console, _) = open_console(&dir);
    assert_eq!(console.view(), View::Characters);
    assert_eq!(console.toggle_view(), View::Planets);
    console.set_view(View::Characters);
    assert_eq!(console.view().title(), "Characters");
}
