// Config loading through the public API, template files included

use fluxdash::config::{Config, ConfigError};
use fluxdash::poll;
use std::fs;

#[test]
fn templated_widget_renders_the_sliding_window_query() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("cpu.flux"),
        "from(bucket: \"telegraf\")\n\
         |> range(start: {{range_start}}, stop: {{range_stop}})\n\
         |> aggregateWindow(every: {{window_every}}, fn: mean)\n",
    )
    .unwrap();
    let config_path = dir.path().join("dashboard.json");
    fs::write(
        &config_path,
        r#"{"rows":[{"widgets":[
            {"title":"CPU","query":"@cpu.flux","color":"cyan","height":2,"span":6,"limit":4},
            {"title":"Literal","query":"buckets()","span":6}
        ]}]}"#,
    )
    .unwrap();

    let config = Config::load(&config_path).unwrap();
    let widgets: Vec<_> = config.widgets().collect();

    let rendered = poll::query_text(widgets[0]).unwrap();
    assert_eq!(
        rendered,
        "from(bucket: \"telegraf\")\n\
         |> range(start: -40s, stop: -10s)\n\
         |> aggregateWindow(every: 1s, fn: mean)\n"
    );
    assert_eq!(poll::query_text(widgets[1]).unwrap(), "buckets()");
}

#[test]
fn template_path_resolves_relative_to_the_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("queries");
    fs::create_dir(&nested).unwrap();
    fs::write(nested.join("mem.flux"), "range(start: {{range_start}})").unwrap();

    let config_path = dir.path().join("dashboard.json");
    fs::write(
        &config_path,
        r#"{"rows":[{"widgets":[{"title":"Mem","query":"@queries/mem.flux"}]}]}"#,
    )
    .unwrap();

    let config = Config::load(&config_path).unwrap();
    let widget = config.widgets().next().unwrap();
    assert_eq!(poll::query_text(widget).unwrap(), "range(start: -40s)");
}

#[test]
fn invalid_json_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("dashboard.json");
    fs::write(&config_path, "{rows: nope").unwrap();

    let err = Config::load(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn missing_config_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}
