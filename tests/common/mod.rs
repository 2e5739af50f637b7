#![allow(dead_code)]

use polars::prelude::*;
use pqview::{App, AppConfig, AppEvent, OpenOptions, Theme};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

/// `id` 0..n, `name` text_<id>, `group` id % 3.
pub fn sample_frame(rows: usize) -> DataFrame {
    let rows = rows as i64;
    df! (
        "id" => (0..rows).collect::<Vec<i64>>(),
        "name" => (0..rows).map(|i| format!("text_{}", i)).collect::<Vec<String>>(),
        "group" => (0..rows).map(|i| i % 3).collect::<Vec<i64>>()
    )
    .unwrap()
}

pub fn write_text(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

pub fn write_csv(dir: &Path, name: &str, df: &mut DataFrame) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();
    path
}

pub fn write_parquet(dir: &Path, name: &str, df: &mut DataFrame) -> PathBuf {
    let path = dir.join(name);
    let file = File::create(&path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();
    path
}

pub fn read_parquet(path: &Path) -> DataFrame {
    ParquetReader::new(File::open(path).unwrap()).finish().unwrap()
}

/// Default options for a viewer session without persisted history.
pub fn test_options() -> OpenOptions {
    use clap::Parser;
    let args = pqview::Args::parse_from(["pqview"]);
    OpenOptions::from_args_and_config(&args, &AppConfig::default()).unwrap()
}

pub fn test_app(opts: OpenOptions) -> (App, Receiver<AppEvent>) {
    let (tx, rx) = mpsc::channel();
    let app = App::new(tx, Theme::default(), AppConfig::default(), opts).with_cache(None);
    (app, rx)
}

/// Feed `first` to the app, then everything the worker sends back, until `done` holds.
pub fn drive(app: &mut App, rx: &Receiver<AppEvent>, first: AppEvent, done: impl Fn(&App) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(60);
    let mut next = Some(first);
    loop {
        while let Some(event) = next.take() {
            if let AppEvent::Crash(message) = &event {
                panic!("engine crashed: {}", message);
            }
            next = app.event(event);
        }
        if done(app) {
            return;
        }
        assert!(Instant::now() < deadline, "timed out waiting for the worker");
        if let Ok(event) = rx.recv_timeout(Duration::from_millis(50)) {
            next = Some(event);
        }
    }
}
