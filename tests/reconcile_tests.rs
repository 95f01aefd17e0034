// tests/reconcile_tests.rs
use keychain_backup_editor::codec::{BinaryPlistCodec, ContainerCodec};
use keychain_backup_editor::error::CoreError;
use keychain_backup_editor::keychain::*;
use keychain_backup_editor::RecordClass;
use serde_json::json;

mod support;
use support::{b64, container_bytes, init_tracing, sample_dump, UNDECRYPTABLE_REF};

fn sample_container() -> Container {
    BinaryPlistCodec
        .decode(&container_bytes(
            &sample_dump(),
            &[(RecordClass::GenericPassword, UNDECRYPTABLE_REF)],
        ))
        .unwrap()
}

fn payloads(container: &Container, class: RecordClass) -> Vec<Vec<u8>> {
    container
        .class(class)
        .unwrap()
        .iter()
        .map(|r| r.payload.clone())
        .collect()
}

#[test]
fn test_project_reports_totals_and_strips_internal_fields() {
    init_tracing();
    let view = project(&sample_container(), &sample_dump()).unwrap();

    let genp = view.class(RecordClass::GenericPassword);
    assert_eq!(genp.total, 4);
    assert_eq!(genp.items.len(), 3);
    assert_eq!(genp.undecrypted(), 1);
    assert_eq!(view.class(RecordClass::Key).total, 0);
    assert_eq!(view.undecrypted(), 1);

    let json = serde_json::to_value(&view).unwrap();
    for class in ["cert", "genp", "inet", "keys"] {
        for item in json[class]["items"].as_array().unwrap() {
            for key in item.as_object().unwrap().keys() {
                assert!(!key.starts_with('_'), "{class} item leaked {key}");
            }
        }
    }
    assert_eq!(json["genp"]["items"][0]["acct"], "alice");
    assert_eq!(json["genp"]["items"][0]["labl"], "mail");
}

#[test]
fn test_project_does_not_mutate_inputs() {
    init_tracing();
    let dump = sample_dump();
    let container = sample_container();
    let _ = project(&container, &dump).unwrap();
    assert_eq!(dump, sample_dump());
    assert!(!dump.class(RecordClass::GenericPassword).unwrap()[0]
        .internal_fields()
        .is_empty());
}

#[test]
fn test_project_fails_on_class_missing_from_dump() {
    init_tracing();
    let mut json = support::sample_dump_json();
    json.as_object_mut().unwrap().remove("Keys");
    let dump: PlaintextDump = serde_json::from_value(json).unwrap();

    let err = project(&sample_container(), &dump).unwrap_err();
    assert!(matches!(
        err,
        CoreError::FormatInconsistency {
            class: RecordClass::Key,
            ..
        }
    ));
}

#[test]
fn test_apply_edits_overwrites_only_named_attributes() {
    init_tracing();
    let mut dump = sample_dump();
    let target = b64(b"genp-0002");
    let edit = EditDescriptor::new(&target).with("labl", "new");

    let outcomes = apply_edits(&mut dump, &[edit]);
    assert_eq!(outcomes[0].class, Some(RecordClass::GenericPassword));

    let record = &dump.class(RecordClass::GenericPassword).unwrap()[1];
    assert_eq!(record.label, Some(json!("new")));
    assert_eq!(record.get("acct"), Some(&json!("bob")));
    assert_eq!(record.get("agrp"), Some(&json!("com.example.chat")));
    assert_eq!(record.persistref.as_deref(), Some(target.as_str()));
}

#[test]
fn test_apply_edits_unmatched_reference_is_a_no_op() {
    init_tracing();
    let mut dump = sample_dump();
    let outcomes = apply_edits(
        &mut dump,
        &[
            EditDescriptor::new(b64(b"nope")).with("labl", "x"),
            EditDescriptor::new("").with("labl", "x"),
        ],
    );
    assert!(outcomes.iter().all(|o| o.class.is_none()));
    assert_eq!(dump, sample_dump());
}

#[test]
fn test_apply_edits_first_class_wins_on_collision() {
    init_tracing();
    let shared = b64(b"shared");
    let mut dump: PlaintextDump = serde_json::from_value(json!({
        "Certs": [{ "persistref": shared, "labl": "cert" }],
        "General": [{ "persistref": shared, "labl": "genp" }],
        "Internet": [],
        "Keys": []
    }))
    .unwrap();

    let outcomes = apply_edits(&mut dump, &[EditDescriptor::new(&shared).with("labl", "edited")]);
    assert_eq!(outcomes[0].class, Some(RecordClass::Certificate));
    assert_eq!(
        dump.class(RecordClass::Certificate).unwrap()[0].label,
        Some(json!("edited"))
    );
    assert_eq!(
        dump.class(RecordClass::GenericPassword).unwrap()[0].label,
        Some(json!("genp"))
    );
}

#[test]
fn test_merge_edits_replaces_only_matched_payload() {
    init_tracing();
    let original = sample_container();
    let mut dump = sample_dump();
    let edits = vec![EditDescriptor::new(b64(b"genp-0002")).with("labl", "new")];
    apply_edits(&mut dump, &edits);

    let fragment = BinaryPlistCodec
        .decode(&container_bytes(&dump, &[]))
        .unwrap();
    let mut merged = original.clone();
    let report = merge_edits(&mut merged, &fragment, &edits).unwrap();

    assert_eq!(report.replaced_total(), 1);
    assert_eq!(report.replaced[&RecordClass::GenericPassword], 1);

    let before = payloads(&original, RecordClass::GenericPassword);
    let after = payloads(&merged, RecordClass::GenericPassword);
    assert_eq!(before.len(), after.len());
    assert_eq!(before[0], after[0]);
    assert_ne!(before[1], after[1]);
    assert_eq!(before[2], after[2]);
    assert_eq!(before[3], after[3]);

    // composite references and order untouched
    let refs = |c: &Container| -> Vec<Vec<u8>> {
        c.class(RecordClass::GenericPassword)
            .unwrap()
            .iter()
            .map(|r| r.persistent_ref.clone())
            .collect()
    };
    assert_eq!(refs(&original), refs(&merged));
    for class in [RecordClass::Certificate, RecordClass::InternetPassword] {
        assert_eq!(payloads(&original, class), payloads(&merged, class));
    }
}

#[test]
fn test_merge_edits_with_no_edits_leaves_container_equal() {
    init_tracing();
    let original = sample_container();
    let mut merged = original.clone();
    let report = merge_edits(&mut merged, &Container::new(), &[]).unwrap();
    assert!(report.is_unchanged());
    assert_eq!(original, merged);
}

#[test]
fn test_merge_edits_skips_malformed_reference() {
    init_tracing();
    let original = sample_container();
    let mut dump = sample_dump();
    let edits = vec![
        EditDescriptor::new("%%% not base64").with("labl", "x"),
        EditDescriptor::new(b64(b"inet-0001")).with("srvr", "example.net"),
    ];
    apply_edits(&mut dump, &edits);
    let fragment = BinaryPlistCodec
        .decode(&container_bytes(&dump, &[]))
        .unwrap();

    let mut merged = original.clone();
    let report = merge_edits(&mut merged, &fragment, &edits).unwrap();
    assert_eq!(report.replaced_total(), 1);
    assert_ne!(
        payloads(&original, RecordClass::InternetPassword),
        payloads(&merged, RecordClass::InternetPassword)
    );
}

#[test]
fn test_merge_edits_accepts_url_safe_reference() {
    init_tracing();
    let raw = b"\xfb\xff\xbf-ref";
    let url_safe =
        base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, raw);
    let standard = b64(raw);
    assert_ne!(url_safe, standard);

    let dump: PlaintextDump = serde_json::from_value(json!({
        "Certs": [], "Internet": [], "Keys": [],
        "General": [{ "persistref": standard, "labl": "before" }]
    }))
    .unwrap();
    let original = BinaryPlistCodec.decode(&container_bytes(&dump, &[])).unwrap();

    let mut edited = dump.clone();
    apply_edits(&mut edited, &[EditDescriptor::new(&standard).with("labl", "after")]);
    let fragment = BinaryPlistCodec.decode(&container_bytes(&edited, &[])).unwrap();

    let mut merged = original.clone();
    let report = merge_edits(
        &mut merged,
        &fragment,
        &[EditDescriptor::new(&url_safe).with("labl", "after")],
    )
    .unwrap();
    assert_eq!(report.replaced_total(), 1);
}

#[test]
fn test_deletes_remove_k_records_from_both_sides() {
    init_tracing();
    let mut dump = sample_dump();
    let mut container = sample_container();
    let deletes = vec![
        DeleteDescriptor::new(b64(b"genp-0001")),
        DeleteDescriptor::new(b64(b"genp-0003")),
    ];

    let removed = apply_deletes(&mut dump, &deletes);
    let report = merge_deletes(&mut container, &deletes).unwrap();

    assert_eq!(removed, 2);
    assert_eq!(report.removed[&RecordClass::GenericPassword], 2);
    assert_eq!(dump.class(RecordClass::GenericPassword).unwrap().len(), 1);
    // 4 entries, one of them undecryptable
    assert_eq!(container.class(RecordClass::GenericPassword).unwrap().len(), 2);
    assert_eq!(
        dump.class(RecordClass::GenericPassword).unwrap()[0].persistref,
        Some(b64(b"genp-0002"))
    );
}

#[test]
fn test_deletes_tolerate_malformed_and_unknown_references() {
    init_tracing();
    let mut container = sample_container();
    let deletes = vec![
        DeleteDescriptor::new("***"),
        DeleteDescriptor::new(b64(b"missing")),
        DeleteDescriptor::new(b64(b"cert-0001")),
    ];
    let report = merge_deletes(&mut container, &deletes).unwrap();
    assert_eq!(report.removed_total(), 1);
    assert!(container.class(RecordClass::Certificate).unwrap().is_empty());
    assert_eq!(container.class(RecordClass::GenericPassword).unwrap().len(), 4);
}

#[test]
fn test_composite_key_matches_container_encoding() {
    let key = composite_key(RecordClass::Certificate, &b64(b"cert-0001")).unwrap();
    let container = sample_container();
    assert_eq!(
        key.as_bytes(),
        container.class(RecordClass::Certificate).unwrap()[0]
            .persistent_ref
            .as_slice()
    );
    assert_eq!(key.to_base64(), b64(b"certcert-0001"));
}

#[test]
fn test_single_label_edit_end_to_end() {
    init_tracing();
    let mut dump: PlaintextDump = serde_json::from_value(json!({
        "General": [{ "persistref": "abc123", "labl": "old" }],
        "Internet": [],
        "Certs": [],
        "Keys": []
    }))
    .unwrap();
    let codec = BinaryPlistCodec;
    let mut container = codec.decode(&container_bytes(&dump, &[])).unwrap();
    let original = container.class(RecordClass::GenericPassword).unwrap()[0].clone();

    let edits = vec![EditDescriptor::new("abc123").with("labl", "new")];
    apply_edits(&mut dump, &edits);
    assert_eq!(
        dump.class(RecordClass::GenericPassword).unwrap()[0].label,
        Some(json!("new"))
    );

    let fragment = codec.decode(&container_bytes(&dump, &[])).unwrap();
    let report = merge_edits(&mut container, &fragment, &edits).unwrap();
    assert_eq!(report.replaced_total(), 1);

    let updated = &container.class(RecordClass::GenericPassword).unwrap()[0];
    assert_eq!(updated.persistent_ref, original.persistent_ref);
    assert_ne!(updated.payload, original.payload);
}

#[test]
fn test_merge_edits_leaves_record_missing_from_fragment_unchanged() {
    init_tracing();
    let mut container = sample_container();
    let before = container.clone();

    let edits = vec![
        EditDescriptor::new(b64(b"genp-0002")).with("labl", "new"),
        EditDescriptor::new(b64(b"inet-0001")).with("srvr", "example.net"),
    ];
    let mut edited = sample_dump();
    apply_edits(&mut edited, &edits);
    // the helper dropped genp-0002 while re-encrypting
    edited
        .class_mut(RecordClass::GenericPassword)
        .unwrap()
        .retain(|r| r.persistref != Some(b64(b"genp-0002")));
    let fragment = BinaryPlistCodec
        .decode(&container_bytes(&edited, &[]))
        .unwrap();

    let report = merge_edits(&mut container, &fragment, &edits).unwrap();

    assert_eq!(report.replaced_total(), 1);
    assert_eq!(report.replaced[&RecordClass::InternetPassword], 1);
    assert_eq!(
        container.class(RecordClass::GenericPassword).unwrap(),
        before.class(RecordClass::GenericPassword).unwrap()
    );
    assert_ne!(
        payloads(&container, RecordClass::InternetPassword),
        payloads(&before, RecordClass::InternetPassword)
    );
}

#[test]
fn test_merge_edits_tolerates_fragment_missing_classes() {
    init_tracing();
    let mut container = sample_container();
    let before = container.clone();

    let edits = vec![
        EditDescriptor::new(b64(b"genp-0002")).with("labl", "new"),
        EditDescriptor::new(b64(b"cert-0001")).with("labl", "Renamed CA"),
    ];
    let mut edited = sample_dump();
    apply_edits(&mut edited, &edits);
    let full = BinaryPlistCodec
        .decode(&container_bytes(&edited, &[]))
        .unwrap();
    // fragment carries genp only
    let mut fragment = Container::new();
    fragment.insert_class(
        RecordClass::GenericPassword,
        full.class(RecordClass::GenericPassword).unwrap().to_vec(),
    );

    let report = merge_edits(&mut container, &fragment, &edits).unwrap();

    assert_eq!(report.replaced_total(), 1);
    assert_eq!(
        container.class(RecordClass::Certificate).unwrap(),
        before.class(RecordClass::Certificate).unwrap()
    );
    let changed: Vec<bool> = payloads(&container, RecordClass::GenericPassword)
        .iter()
        .zip(payloads(&before, RecordClass::GenericPassword))
        .map(|(after, before)| *after != before)
        .collect();
    assert_eq!(changed, [false, true, false, false]);
}

#[test]
fn test_records_without_reference_survive_untouched() {
    init_tracing();
    let input = json!({
        "General": [
            { "labl": "no ref" },
            { "persistref": null, "labl": "null ref" },
            { "persistref": b64(b"genp-0001"), "labl": "mail" }
        ]
    });
    let mut dump: PlaintextDump = serde_json::from_value(input.clone()).unwrap();

    let records = dump.class(RecordClass::GenericPassword).unwrap();
    assert_eq!(records[0].persistref, None);
    assert_eq!(records[1].persistref, None);

    let outcomes = apply_edits(&mut dump, &[EditDescriptor::new("").with("labl", "x")]);
    assert_eq!(outcomes[0].class, None);
    assert_eq!(apply_deletes(&mut dump, &[DeleteDescriptor::new("")]), 0);

    let written: serde_json::Value =
        serde_json::from_slice(&dump.to_json_pretty().unwrap()).unwrap();
    assert_eq!(written, input);
    assert!(written["General"][0].get("persistref").is_none());
    assert!(written["General"][1]["persistref"].is_null());
}
