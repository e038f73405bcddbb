//! Record lifecycle against a real (in-memory) store, plus rename flows
//! on a temporary directory.

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, Set};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use telarr::config::Config;
use telarr::db::Store;
use telarr::entities::tv_episode;
use telarr::error::MediaError;
use telarr::metadata::{EpisodeMetadata, MetadataProvider, ShowMetadata};
use telarr::models::ShowRecord;
use telarr::quality::{self, Quality, QualityPreference, Status};
use telarr::services::rename::{RenameService, TokioFileMover};
use telarr::services::ImportService;
use tokio::sync::RwLock;

struct FakeProvider {
    episodes: HashMap<(i32, i32), EpisodeMetadata>,
    by_airdate: HashMap<NaiveDate, (i32, i32)>,
}

impl FakeProvider {
    fn new() -> Self {
        Self {
            episodes: HashMap::new(),
            by_airdate: HashMap::new(),
        }
    }

    fn with_episode(mut self, season: i32, episode: i32, title: &str, aired: &str) -> Self {
        self.episodes.insert(
            (season, episode),
            EpisodeMetadata {
                title: Some(title.to_string()),
                overview: Some(format!("{title} overview")),
                first_aired: Some(aired.to_string()),
            },
        );
        self
    }
}

#[async_trait]
impl MetadataProvider for FakeProvider {
    async fn show(&self, _show_id: i64) -> Result<Option<ShowMetadata>, MediaError> {
        Ok(Some(ShowMetadata {
            name: "Demo Show".to_string(),
            status: "Continuing".to_string(),
            air_by_date: false,
        }))
    }

    async fn episode(
        &self,
        _show_id: i64,
        season: i32,
        episode: i32,
    ) -> Result<Option<EpisodeMetadata>, MediaError> {
        Ok(self.episodes.get(&(season, episode)).cloned())
    }

    async fn episode_by_airdate(
        &self,
        _show_id: i64,
        date: NaiveDate,
    ) -> Result<Option<(i32, i32)>, MediaError> {
        Ok(self.by_airdate.get(&date).copied())
    }
}

async fn test_show(store: &Store) -> ShowRecord {
    let mut show = ShowRecord::new(101, "Demo Show");
    show.preference = QualityPreference::new(
        vec![Quality::SdTv, Quality::Hd720p],
        vec![Quality::Hd1080p],
    );
    show.save(store).await.unwrap();
    show
}

#[tokio::test]
async fn episode_round_trips_through_store() {
    let store = Store::in_memory().await.unwrap();
    let show = test_show(&store).await;

    let handle = store_episode(&store, &show, 1, 2).await;
    {
        let mut ep = handle.lock().await;
        ep.set_name("Pilot");
        ep.set_airdate(NaiveDate::from_ymd_opt(2011, 3, 9).unwrap());
        ep.set_status(quality::encode(Status::Snatched, Quality::Hd720p));
        ep.set_release_name("Demo.Show.S01E02.720p.HDTV.x264-LOL");
        ep.save(&store, false).await.unwrap();
        assert!(!ep.is_dirty());
    }

    // a fresh show object sees exactly what was saved
    let reloaded = ShowRecord::load(&store, show.id).await.unwrap();
    let restored = reloaded.get_or_create_episode(&store, 1, 2).await.unwrap();
    let ep = restored.lock().await;
    assert_eq!(ep.name(), "Pilot");
    assert_eq!(
        quality::decode(ep.status()),
        (Status::Snatched, Quality::Hd720p)
    );
    assert_eq!(ep.release_name(), "Demo.Show.S01E02.720p.HDTV.x264-LOL");
    assert!(!ep.is_dirty());
}

async fn store_episode(
    store: &Store,
    show: &ShowRecord,
    season: i32,
    episode: i32,
) -> telarr::models::show::EpisodeHandle {
    show.get_or_create_episode(store, season, episode)
        .await
        .unwrap()
}

#[tokio::test]
async fn lazy_creation_returns_one_record_per_key() {
    let store = Store::in_memory().await.unwrap();
    let show = test_show(&store).await;

    let first = store_episode(&store, &show, 1, 1).await;
    let second = store_episode(&store, &show, 1, 1).await;
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn duplicate_rows_are_ambiguous_not_merged() {
    let store = Store::in_memory().await.unwrap();
    let show = test_show(&store).await;

    for _ in 0..2 {
        let row = tv_episode::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            show_id: Set(show.id),
            season: Set(3),
            episode: Set(7),
            name: Set(String::new()),
            description: Set(String::new()),
            airdate: Set("0001-01-01".to_string()),
            status: Set(0),
            location: Set(String::new()),
            file_size: Set(0),
            release_name: Set(String::new()),
            is_proper: Set(false),
            subtitles: Set(String::new()),
            subtitles_searchcount: Set(0),
            subtitles_lastsearch: Set(String::new()),
        };
        row.insert(&store.conn).await.unwrap();
    }

    let result = store.get_episode_row(show.id, 3, 7).await;
    assert!(matches!(result, Err(MediaError::AmbiguousState(_))));
}

#[tokio::test]
async fn indexer_refresh_deletes_vanished_episode() {
    let store = Store::in_memory().await.unwrap();
    let show = test_show(&store).await;
    let provider = FakeProvider::new().with_episode(1, 1, "Pilot", "2011-03-09");

    // episode 1x01 exists on the indexer and refreshes fine
    show.refresh_episode(&store, &provider, 1, 1).await.unwrap();
    let handle = show.episode(1, 1).unwrap();
    assert_eq!(handle.lock().await.name(), "Pilot");

    // 1x02 does not: the record dies and the signal propagates
    let result = show.refresh_episode(&store, &provider, 1, 2).await;
    assert!(matches!(result, Err(MediaError::EpisodeDeleted)));
    assert!(show.episode(1, 2).is_none());
    assert!(store.get_episode_row(show.id, 1, 2).await.unwrap().is_none());
}

#[tokio::test]
async fn want_episode_consults_persisted_status() {
    let store = Store::in_memory().await.unwrap();
    let show = test_show(&store).await;

    let handle = store_episode(&store, &show, 1, 5).await;
    {
        let mut ep = handle.lock().await;
        ep.set_status(quality::encode(Status::Snatched, Quality::SdTv));
        ep.save(&store, false).await.unwrap();
    }

    // better quality from the best list: wanted
    assert!(show
        .want_episode(&store, 1, 5, Quality::Hd1080p, false)
        .await
        .unwrap());
    // quality in neither list: never wanted
    assert!(!show
        .want_episode(&store, 1, 5, Quality::Uhd4k, false)
        .await
        .unwrap());
    // unknown episode identity: not wanted
    assert!(!show
        .want_episode(&store, 9, 9, Quality::Hd1080p, false)
        .await
        .unwrap());
}

#[tokio::test]
async fn import_and_rename_flow() {
    let store = Store::in_memory().await.unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let show_dir = tmp.path().join("Demo Show");
    std::fs::create_dir_all(&show_dir).unwrap();

    let mut show = test_show(&store).await;
    show.location = show_dir.to_string_lossy().to_string();
    show.save(&store).await.unwrap();

    let source = show_dir.join("Demo.Show.S01E02.720p.HDTV.x264-LOL.mkv");
    std::fs::write(&source, b"video bytes").unwrap();
    let sidecar = show_dir.join("Demo.Show.S01E02.720p.HDTV.x264-LOL.en.srt");
    std::fs::write(&sidecar, b"1\n00:00:01,000 --> 00:00:02,000\nhi\n").unwrap();

    let provider = Arc::new(FakeProvider::new());
    let importer = ImportService::new(store.clone(), provider);
    let root = importer.import_file(&show, &source).await.unwrap().unwrap();

    {
        let mut ep = root.lock().await;
        assert_eq!(
            quality::decode(ep.status()),
            (Status::Downloaded, Quality::Hd720p)
        );
        assert!(ep.file_size() > 0);
        ep.set_name("Pilot");
        ep.save(&store, false).await.unwrap();
    }

    let config = Arc::new(RwLock::new(Config::default()));
    let renamer = RenameService::new(store.clone(), config, Arc::new(TokioFileMover));

    let preview = renamer.preview(&show).await.unwrap();
    assert_eq!(preview.len(), 1);
    assert!(preview[0].new_filename.contains("S01E02"));

    let result = renamer.execute(&show).await.unwrap();
    assert_eq!(result.renamed, 1);
    assert_eq!(result.failed, 0);

    let target = show_dir
        .join("Season 01")
        .join("Demo Show - S01E02 - Pilot.mkv");
    assert!(target.is_file(), "expected {target:?} to exist");
    assert!(!source.exists());

    // the subtitle sidecar moved with the episode
    let moved_sidecar = show_dir
        .join("Season 01")
        .join("Demo Show - S01E02 - Pilot.en.srt");
    assert!(moved_sidecar.is_file());

    {
        let ep = root.lock().await;
        assert_eq!(Path::new(ep.location()), target.as_path());
        assert_eq!(ep.subtitles(), ["en"]);
    }

    // renaming again is a no-op, not an error
    let again = renamer.execute(&show).await.unwrap();
    assert_eq!(again.renamed, 0);
    assert_eq!(again.failed, 0);
}

#[tokio::test]
async fn multi_episode_file_renames_as_one_group() {
    let store = Store::in_memory().await.unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let show_dir = tmp.path().join("Demo Show");
    std::fs::create_dir_all(&show_dir).unwrap();

    let mut show = test_show(&store).await;
    show.location = show_dir.to_string_lossy().to_string();
    show.save(&store).await.unwrap();

    let source = show_dir.join("Demo.Show.S01E01E02.720p.HDTV.x264-LOL.mkv");
    std::fs::write(&source, b"double episode").unwrap();

    let provider = Arc::new(FakeProvider::new());
    let importer = ImportService::new(store.clone(), provider);
    let root = importer.import_file(&show, &source).await.unwrap().unwrap();
    assert_eq!(root.lock().await.related(), [(1, 2)]);

    for (episode, title) in [(1, "Foo (1)"), (2, "Foo (2)")] {
        let handle = show.episode(1, episode).unwrap();
        let mut ep = handle.lock().await;
        ep.set_name(title);
        ep.save(&store, false).await.unwrap();
    }

    let config = Arc::new(RwLock::new(Config::default()));
    let renamer = RenameService::new(store.clone(), config, Arc::new(TokioFileMover));
    let result = renamer.execute(&show).await.unwrap();
    assert_eq!(result.renamed, 1);

    let target = show_dir
        .join("Season 01")
        .join("Demo Show - S01E01-E02 - Foo.mkv");
    assert!(target.is_file(), "expected {target:?} to exist");

    // both bundled records point at the one file
    for episode in [1, 2] {
        let handle = show.episode(1, episode).unwrap();
        assert_eq!(
            Path::new(handle.lock().await.location()),
            target.as_path()
        );
    }
}

#[tokio::test]
async fn bulk_load_wires_related_groups() {
    let store = Store::in_memory().await.unwrap();
    let show = test_show(&store).await;

    for episode in [1, 2] {
        let handle = store_episode(&store, &show, 1, episode).await;
        let mut ep = handle.lock().await;
        ep.set_name(format!("Ep {episode}"));
        // both rows share one location on disk
        ep.set_location("/tv/Demo Show/Demo Show - S01E01-E02.mkv");
        ep.save(&store, false).await.unwrap();
    }

    let fresh = ShowRecord::load(&store, show.id).await.unwrap();
    assert_eq!(fresh.load_episodes(&store).await.unwrap(), 2);

    let first = fresh.episode(1, 1).unwrap();
    assert_eq!(first.lock().await.related(), [(1, 2)]);
    let second = fresh.episode(1, 2).unwrap();
    assert_eq!(second.lock().await.related(), [(1, 1)]);
}

#[tokio::test]
async fn should_update_gates_ended_shows() {
    let store = Store::in_memory().await.unwrap();
    let mut show = test_show(&store).await;
    let today = NaiveDate::from_ymd_opt(2012, 6, 1).unwrap();

    // continuing shows always refresh
    show.status = "Continuing".to_string();
    assert!(show.should_update(&store, today).await.unwrap());

    // an ended show with an episode that aired years ago stays quiet
    show.status = "Ended".to_string();
    show.last_refreshed = today;
    let handle = store_episode(&store, &show, 1, 1).await;
    {
        let mut ep = handle.lock().await;
        ep.set_airdate(NaiveDate::from_ymd_opt(2008, 1, 1).unwrap());
        ep.set_status(quality::encode(Status::Skipped, Quality::Unknown));
        ep.save(&store, false).await.unwrap();
    }
    assert!(!show.should_update(&store, today).await.unwrap());

    // a finale inside the grace window keeps refreshes coming
    {
        let mut ep = handle.lock().await;
        ep.set_airdate(today - chrono::Duration::days(10));
        ep.save(&store, false).await.unwrap();
    }
    assert!(show.should_update(&store, today).await.unwrap());
}
