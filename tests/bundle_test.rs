use std::fs;
use std::path::Path;

use shimframe::fetch::{FetchError, ResourceFetcher};
use shimframe::{BundleFetcher, RouteTable, Translations};

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

#[tokio::test]
async fn versioned_locale_file_is_preferred() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "hbui/VERSION", "1.21.0\nbuild metadata\n");
    write(
        dir.path(),
        "loc.1.21.0.lang",
        "# comment line\r\ngreeting=Hello %1$s\r\nformula=a=b# trailing\n\n",
    );
    write(dir.path(), "loc.lang", "greeting=unversioned\n");

    let fetcher = BundleFetcher::from_location(dir.path().to_str().unwrap()).unwrap();
    let translations = Translations::load(&fetcher, "hbui/VERSION", "loc").await;

    assert_eq!(translations.translate_with_parameters("greeting", &["World"]), "Hello World");
    assert_eq!(translations.get("formula"), Some("a"));
    assert_eq!(translations.len(), 2);
}

#[tokio::test]
async fn unversioned_locale_file_without_version() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "loc.lang", "menu.play=Play\n");

    let fetcher = BundleFetcher::from_location(dir.path().to_str().unwrap()).unwrap();
    let translations = Translations::load(&fetcher, "hbui/VERSION", "loc").await;

    assert_eq!(translations.translate("menu.play"), "Play");
    assert_eq!(translations.translate("menu.quit"), "menu.quit");
}

#[tokio::test]
async fn missing_locale_degrades_to_raw_keys() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = BundleFetcher::from_location(dir.path().to_str().unwrap()).unwrap();
    let translations = Translations::load(&fetcher, "hbui/VERSION", "loc").await;

    assert!(translations.is_empty());
    assert_eq!(translations.translate("menu.play"), "menu.play");
}

#[tokio::test]
async fn route_manifest_loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "hbui/routes.json",
        r#"{ "routes": [ { "fileName": "hbui/menu.html", "supportedRoutes": [
            { "route": "/badger/mainMenu", "regexp": "^/badger/mainMenu" },
            { "route": "/broken", "regexp": "(" }
        ] } ] }"#,
    );

    let fetcher = BundleFetcher::from_location(dir.path().to_str().unwrap()).unwrap();
    let table = RouteTable::load(&fetcher, "/hbui/routes.json").await.unwrap();

    assert_eq!(table.len(), 1);
    let found = table.resolve("/badger/mainMenu").unwrap();
    assert_eq!(found.entry.file_name, "hbui/menu.html");
    assert!(table.resolve("/broken").is_none());
}

#[tokio::test]
async fn missing_file_reports_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = BundleFetcher::from_location(dir.path().to_str().unwrap()).unwrap();

    let err = fetcher.fetch_text("hbui/missing.html").await.unwrap_err();
    assert!(matches!(err, FetchError::NotFound(_)));
}
