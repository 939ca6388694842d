// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for constants module

use camera_pipeline::constants::{ProcessorKind, RGBA_BYTES_PER_PIXEL, rgba_frame_len};

#[test]
fn test_processor_kind_values() {
    // Test that all processors exist (Edges, Grayscale, Blank)
    assert_eq!(ProcessorKind::ALL.len(), 3);
    assert_eq!(ProcessorKind::default(), ProcessorKind::Edges);
}

#[test]
fn test_processor_kind_display_names() {
    for kind in ProcessorKind::ALL {
        assert!(
            !kind.display_name().is_empty(),
            "Display name should not be empty"
        );
        assert_eq!(kind.to_string(), kind.display_name());
    }
}

#[test]
fn test_processor_kind_from_name() {
    assert_eq!(ProcessorKind::from_name("edges"), Some(ProcessorKind::Edges));
    assert_eq!(ProcessorKind::from_name(" Gray "), Some(ProcessorKind::Grayscale));
    assert_eq!(ProcessorKind::from_name("zero"), Some(ProcessorKind::Blank));
    assert_eq!(ProcessorKind::from_name("sepia"), None);
}

#[test]
fn test_processor_kind_serde_names() {
    let json = serde_json::to_string(&ProcessorKind::Grayscale).expect("serialize");
    assert_eq!(json, "\"grayscale\"");
    let kind: ProcessorKind = serde_json::from_str("\"blank\"").expect("deserialize");
    assert_eq!(kind, ProcessorKind::Blank);
}

#[test]
fn test_rgba_frame_len() {
    assert_eq!(RGBA_BYTES_PER_PIXEL, 4);
    assert_eq!(rgba_frame_len(640, 480), 640 * 480 * 4);
    assert_eq!(rgba_frame_len(0, 480), 0);
}
