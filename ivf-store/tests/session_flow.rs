use chrono::{NaiveDate, Utc};
use ivf_core::{Cycle, CycleGoal, CycleStatus, TrackerConfig};
use ivf_meds::{add_scheduled_medication, DoseTarget, NewScheduledMedication, StatusAction};
use ivf_store::{AuthError, FileStore, KeyValueStore, Session, StoreConfig, StoreError};
use serde_json::json;

fn config() -> StoreConfig {
    StoreConfig {
        password_iterations: 1_000,
        ..StoreConfig::default()
    }
}

fn date(text: &str) -> NaiveDate {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").expect("valid date")
}

fn seed_cycle(session: &mut Session<FileStore>) {
    session
        .tracker_mut()
        .expect("signed in")
        .update(|data| {
            data.cycles.push(Cycle {
                id: "cycle-1".to_string(),
                name: "Spring retrieval".to_string(),
                goal: CycleGoal::Retrieval,
                protocol: "antagonist".to_string(),
                status: CycleStatus::Active,
                start_date: date("2024-03-01"),
                end_date: None,
                days: Vec::new(),
                outcome: None,
                costs: None,
                notes: None,
            });
            add_scheduled_medication(
                data,
                "cycle-1",
                NewScheduledMedication {
                    name: "Gonal-F".to_string(),
                    dosage: "225 IU".to_string(),
                    time: Some("8:00 PM".to_string()),
                    start_day: 1,
                    end_day: 5,
                    ..NewScheduledMedication::default()
                },
                Utc::now(),
            )
        })
        .expect("seed cycle");
}

#[test]
fn data_survives_reopening_the_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = Session::open(FileStore::new(dir.path()), config()).expect("open");
    session
        .create_account("hope", "Hope", "hope@example.com", "pw")
        .expect("create account");
    seed_cycle(&mut session);

    let medication_id = session.data().medication_schedules[0].medications[0].id.clone();
    let target = DoseTarget {
        cycle_id: "cycle-1".to_string(),
        day_number: 3,
        date: date("2024-03-03"),
        medication_id,
    };
    session
        .tracker_mut()
        .expect("signed in")
        .apply_status_action(&target, &StatusAction::MarkTaken { at: None })
        .expect("mark taken");
    drop(session);

    let reopened = Session::open(FileStore::new(dir.path()), config()).expect("reopen");
    assert_eq!(
        reopened.current_user().map(|user| user.username.as_str()),
        Some("hope")
    );
    let day = reopened
        .tracker()
        .reconcile_day("cycle-1", 3, date("2024-03-03"), &TrackerConfig::default());
    assert_eq!(day.total, 1);
    assert!(day.medications[0].taken);
}

#[test]
fn switching_users_swaps_the_whole_snapshot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = Session::open(FileStore::new(dir.path()), config()).expect("open");
    let hope = session
        .create_account("hope", "Hope", "hope@example.com", "pw")
        .expect("hope");
    seed_cycle(&mut session);

    let sam = session
        .create_account("sam", "Sam", "sam@example.com", "pw2")
        .expect("sam");
    assert_eq!(session.current_user().map(|u| u.id.as_str()), Some(sam.id.as_str()));
    assert!(session.data().cycles.is_empty());

    session.switch_user(&hope.id).expect("switch");
    assert_eq!(session.data().cycles.len(), 1);
    assert_eq!(session.tracker().summary().total_cycles, 1);

    assert!(matches!(
        session.switch_user("nobody"),
        Err(AuthError::UserNotFound(_))
    ));
}

#[test]
fn login_and_logout() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = Session::open(FileStore::new(dir.path()), config()).expect("open");
    session
        .create_account("hope", "Hope", "hope@example.com", "pw")
        .expect("create");
    session.logout().expect("logout");
    assert!(session.current_user().is_none());
    assert!(session.tracker_mut().is_err());

    assert!(matches!(
        session.login_user("hope", "wrong"),
        Err(AuthError::InvalidCredentials)
    ));
    let user = session.login_user("hope", "pw").expect("login");
    assert!(user.last_login_at.is_some());
    assert!(session.tracker_mut().is_ok());

    assert!(matches!(
        session.create_account("HOPE", "Again", "again@example.com", "pw"),
        Err(AuthError::DuplicateUsername(_))
    ));
}

#[test]
fn deleting_an_account_removes_its_blob() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = Session::open(FileStore::new(dir.path()), config()).expect("open");
    let user = session
        .create_account("hope", "Hope", "hope@example.com", "pw")
        .expect("create");
    seed_cycle(&mut session);

    let data_key = config().data_key(&user.id);
    session.delete_account(&user.id).expect("delete");
    assert!(session.current_user().is_none());
    assert!(session.users().is_empty());
    assert!(session.data().cycles.is_empty());

    let backend = session.into_backend();
    assert_eq!(backend.get(&data_key).expect("get"), None);
}

#[test]
fn unreadable_blob_does_not_move_the_active_user() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = Session::open(FileStore::new(dir.path()), config()).expect("open");
    let sam = session
        .create_account("sam", "Sam", "sam@example.com", "pw")
        .expect("sam");
    let hope = session
        .create_account("hope", "Hope", "hope@example.com", "pw")
        .expect("hope");
    seed_cycle(&mut session);

    FileStore::new(dir.path())
        .set(&config().data_key(&sam.id), &json!({"cycles": 3}))
        .expect("corrupt blob");

    assert!(matches!(
        session.switch_user(&sam.id),
        Err(AuthError::Store(StoreError::Serde(_)))
    ));
    assert_eq!(session.current_user().map(|u| u.id.as_str()), Some(hope.id.as_str()));
    assert_eq!(session.tracker().active_user(), Some(hope.id.as_str()));
    assert_eq!(session.data().cycles.len(), 1);
    drop(session);

    let reopened = Session::open(FileStore::new(dir.path()), config()).expect("reopen");
    assert_eq!(reopened.current_user().map(|u| u.id.as_str()), Some(hope.id.as_str()));
    assert_eq!(reopened.data().cycles.len(), 1);
}

#[test]
fn unreadable_blob_on_open_starts_signed_out() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = Session::open(FileStore::new(dir.path()), config()).expect("open");
    let hope = session
        .create_account("hope", "Hope", "hope@example.com", "pw")
        .expect("hope");
    drop(session);

    FileStore::new(dir.path())
        .set(&config().data_key(&hope.id), &json!({"cycles": 3}))
        .expect("corrupt blob");

    let reopened = Session::open(FileStore::new(dir.path()), config()).expect("reopen");
    assert!(reopened.current_user().is_none());
    assert_eq!(reopened.users().len(), 1);
}
