//! Unit tests for options and colors

use crate::error::EditorError;
use crate::style::{color_for_label, Color, EditorOptions};

#[test]
fn test_color_hex() {
    assert_eq!(Color::from_hex("#C5CBD3"), Some(Color::rgb(0xc5, 0xcb, 0xd3)));
    assert_eq!(Color::rgb(0x18, 0x00, 0x19).to_hex(), "#180019");
    let translucent = Color::from_hex("#00000080").unwrap();
    assert_eq!(translucent.a, 0x80);
    assert_eq!(translucent.to_hex(), "#00000080");
    assert_eq!(Color::from_hex("180019"), None);
    assert_eq!(Color::from_hex("#12345"), None);
    assert_eq!(Color::from_hex("#zzzzzz"), None);
}

#[test]
fn test_default_options() {
    let options = EditorOptions::default();
    assert_eq!(options.state_radius, 30.0);
    assert_eq!(options.self_link_height, 100.0);
    assert_eq!(options.min_zoom, 0.01);
    assert_eq!(options.max_zoom, 20.0);
    assert!(options.selectable_states);
    assert_eq!(options.initial_state_stroke, Color::ORANGE);

    let params = options.link_params();
    assert_eq!(params.radius, 30.0);
    assert_eq!(params.curvature, 30.0);
    assert_eq!(params.loop_height, 100.0);
}

#[test]
fn test_partial_options_json() {
    let options = EditorOptions::from_json(r##"{ "stateRadius": 20, "stateFill": "#000000" }"##).unwrap();
    assert_eq!(options.state_radius, 20.0);
    assert_eq!(options.state_fill, Color::rgb(0, 0, 0));
    assert_eq!(options.max_zoom, 20.0);
    assert!(EditorOptions::from_json(r#"{ "stateFill": "red" }"#).is_err());
}

#[test]
fn test_clamp_zoom() {
    let options = EditorOptions::default();
    assert_eq!(options.clamp_zoom(50.0), 20.0);
    assert_eq!(options.clamp_zoom(0.0), 0.01);
    assert_eq!(options.clamp_zoom(1.5), 1.5);
}

#[test]
fn test_label_colors_are_stable() {
    assert_eq!(color_for_label("go"), color_for_label("go"));
    assert_ne!(color_for_label("go"), color_for_label("stop"));
    assert_eq!(color_for_label("").a, 255);
}

#[test]
fn test_options_reject_bad_zoom_bounds() {
    for source in [
        r#"{ "minZoom": 0.0 }"#,
        r#"{ "minZoom": -1.0 }"#,
        r#"{ "minZoom": 5.0, "maxZoom": 2.0 }"#,
        r#"{ "stateRadius": 0 }"#,
    ] {
        assert!(
            matches!(EditorOptions::from_json(source), Err(EditorError::Validation(_))),
            "accepted {}",
            source
        );
    }
    assert!(EditorOptions::default().validate().is_ok());
    assert!(EditorOptions::from_json(r#"{ "minZoom": 0.5, "maxZoom": 0.5 }"#).is_ok());
}
