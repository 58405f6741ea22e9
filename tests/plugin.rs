//! Plugin envelope, server connection, and log protocol tests.

mod common;

use imagecapture::{
    CaptureConfig, CaptureError, PluginArgs, PluginOutput, ServerConnection, StashClient,
    logging::{format_line, level_char},
    plugin::{dispatch, parse_input},
};
use log::Level;
use serde_json::json;

use common::InMemoryHost;

fn args(value: serde_json::Value) -> PluginArgs {
    serde_json::from_value(value).unwrap()
}

// ── Request parsing ───────────────────────────────────────────────

#[test]
fn parses_host_request() {
    let input = parse_input(
        r#"{
            "server_connection": {
                "Scheme": "http", "Host": "0.0.0.0", "Port": 9999,
                "SessionCookie": {"Name": "session", "Value": "abc", "Path": "", "Domain": ""},
                "Dir": "/root/.stash", "PluginDir": "/root/.stash/plugins/imagecapture"
            },
            "args": {"mode": "captureFrame", "scene_id": "42", "frame_idx": "120"}
        }"#,
    )
    .unwrap();

    assert_eq!(input.server_connection.port, 9999);
    assert_eq!(input.server_connection.session_cookie.as_ref().unwrap().value, "abc");
    assert!(input.args.is_capture());
    assert_eq!(input.args.scene_id().as_deref(), Some("42"));
    assert_eq!(input.args.frame_index().unwrap(), 120);
}

#[test]
fn malformed_request_is_a_json_error() {
    assert!(matches!(parse_input("{"), Err(CaptureError::Json(_))));
    assert!(matches!(parse_input(r#"{"args": {}}"#), Err(CaptureError::Json(_))));
}

#[test]
fn numeric_arguments_are_accepted() {
    let args = args(json!({"mode": "captureFrame", "scene_id": 42, "frame_idx": 7}));
    assert_eq!(args.scene_id().as_deref(), Some("42"));
    assert_eq!(args.frame_index().unwrap(), 7);
}

#[test]
fn unset_frame_index_means_first_frame() {
    for value in [json!(null), json!(false), json!("None"), json!("null")] {
        let args = args(json!({"frame_idx": value}));
        assert_eq!(args.frame_index().unwrap(), 0, "{value}");
    }
    assert_eq!(PluginArgs::default().frame_index().unwrap(), 0);
}

#[test]
fn invalid_frame_index_is_rejected() {
    for value in [json!(-3), json!("-3"), json!("twelve"), json!([1])] {
        let args = args(json!({"frame_idx": value}));
        assert!(
            matches!(args.frame_index(), Err(CaptureError::InvalidRequest(_))),
            "{value}"
        );
    }
}

#[test]
fn unset_scene_means_nothing_to_do() {
    for value in [json!(null), json!("None"), json!("")] {
        assert_eq!(args(json!({"scene_id": value})).scene_id(), None);
    }
}

#[test]
fn overrides_apply_to_config() {
    let args = args(json!({"rescan": "false", "register": true, "quality": "75"}));
    let config = args.apply(CaptureConfig::new());
    assert!(config.register());
    assert!(config.rescan());
    assert_eq!(config.jpeg_quality(), 75);

    let args = crate::args(json!({"rescan": 0, "quality": 400}));
    let config = args.apply(CaptureConfig::new());
    assert!(!config.rescan());
    assert_eq!(config.jpeg_quality(), 100);
}

// ── Dispatch ──────────────────────────────────────────────────────

#[test]
fn unknown_mode_answers_ok() {
    let host = InMemoryHost::default();
    let output = dispatch(&host, &args(json!({"mode": "cleanup"})), CaptureConfig::new());
    assert_eq!(output, PluginOutput::ok("ok"));
}

#[test]
fn capture_without_scene_answers_ok() {
    let host = InMemoryHost::default();
    let output = dispatch(&host, &args(json!({"mode": "captureFrame"})), CaptureConfig::new());
    assert_eq!(output, PluginOutput::ok("ok"));
}

#[test]
fn failed_capture_still_answers_ok() {
    let host = InMemoryHost::default();
    let request = args(json!({"mode": "captureFrame", "scene_id": "404", "frame_idx": "1"}));
    let output = dispatch(&host, &request, CaptureConfig::new());
    assert_eq!(output, PluginOutput::ok("ok"));
}

#[test]
fn bad_frame_index_answers_with_error() {
    let host = InMemoryHost::default();
    let request = args(json!({"mode": "captureFrame", "scene_id": "1", "frame_idx": "soon"}));
    let output = dispatch(&host, &request, CaptureConfig::new());
    assert!(output.output.is_none());
    assert!(output.error.unwrap().contains("frame_idx"));
}

// ── Server connection ─────────────────────────────────────────────

#[test]
fn wildcard_host_is_contacted_as_localhost() {
    let connection: ServerConnection =
        serde_json::from_value(json!({"Scheme": "http", "Host": "0.0.0.0", "Port": 9999})).unwrap();
    assert_eq!(connection.endpoint(), "http://localhost:9999/graphql");
}

#[test]
fn explicit_host_and_scheme_are_kept() {
    let connection: ServerConnection = serde_json::from_value(
        json!({"Scheme": "https", "Host": "media.lan", "Port": 443, "ApiKey": "secret"}),
    )
    .unwrap();
    assert_eq!(connection.endpoint(), "https://media.lan:443/graphql");

    let client = StashClient::new(&connection).unwrap();
    assert_eq!(client.endpoint(), "https://media.lan:443/graphql");
}

#[test]
fn scheme_defaults_to_http() {
    let connection: ServerConnection = serde_json::from_value(json!({"Port": 9999})).unwrap();
    assert_eq!(connection.endpoint(), "http://localhost:9999/graphql");
}

#[test]
fn invalid_cookie_is_rejected() {
    let connection: ServerConnection = serde_json::from_value(json!({
        "Port": 9999,
        "SessionCookie": {"Name": "session", "Value": "bad\nvalue"}
    }))
    .unwrap();
    assert!(matches!(StashClient::new(&connection), Err(CaptureError::Host(_))));
}

// ── Log protocol ──────────────────────────────────────────────────

#[test]
fn log_lines_carry_level_prefix() {
    assert_eq!(format_line('i', "hello"), "\u{1}i\u{2}hello\n");
    assert_eq!(level_char(Level::Warn), 'w');
    assert_eq!(level_char(Level::Trace), 't');
}

#[test]
fn multi_line_messages_are_split() {
    assert_eq!(format_line('e', "first\nsecond"), "\u{1}e\u{2}first\n\u{1}e\u{2}second\n");
}

#[test]
fn empty_message_still_emits_a_line() {
    assert_eq!(format_line('d', ""), "\u{1}d\u{2}\n");
}
