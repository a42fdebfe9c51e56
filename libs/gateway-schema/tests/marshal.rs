use gateway_errors::FailureKind;
use gateway_schema::{Resource, SchemaRegistry, Value};
use serde_json::json;

const CONTRACT: &str = r#"
enums:
  HostState: [STARTED, STOPPED, ERROR]
  VolumeSpeed: [COLD, HDD, SSD]
resources:
  Identity:
    fields:
      - { name: user, type: string, required: true }
      - { name: app_key, wire: appKey, type: string, required: true }
  Host:
    fields:
      - { name: id, type: string }
      - { name: name, type: string, required: true }
      - { name: state, type: HostState }
      - { name: cores, type: integer }
      - { name: ram, type: number }
      - { name: public, type: boolean }
      - { name: tags, type: 'map<string>' }
  Cluster:
    fields:
      - { name: name, type: string, required: true }
      - { name: masters, type: 'list<Host>' }
      - { name: identity, type: Identity }
  Volume:
    fields:
      - { name: name, type: string, required: true }
      - { name: size, type: integer, required: true }
      - { name: speed, type: VolumeSpeed }
      - { name: mount_path, wire: mountPath, type: string, nullable: true }
"#;

fn registry() -> SchemaRegistry {
    SchemaRegistry::from_yaml(CONTRACT).unwrap()
}

#[test]
fn round_trip_preserves_every_field() {
    let reg = registry();
    let m = reg.marshaller();

    let host = |name: &str| {
        Resource::new("Host")
            .with("id", format!("id-{name}"))
            .with("name", name)
            .with("state", Value::enumeration("STARTED"))
            .with("cores", 4)
            .with("ram", 7.5)
            .with("public", true)
            .with(
                "tags",
                Value::Map([("env".to_string(), Value::from("prod"))].into_iter().collect()),
            )
    };
    let cluster = Resource::new("Cluster")
        .with("name", "c1")
        .with("masters", vec![host("m1").into(), host("m2").into()])
        .with(
            "identity",
            Resource::new("Identity").with("user", "ops").with("app_key", "k"),
        );

    let wire = m.encode(&cluster).unwrap();
    assert_eq!(wire["identity"]["appKey"], "k");
    assert_eq!(wire["masters"][1]["state"], "STARTED");

    let back = m.decode("Cluster", &wire).unwrap();
    assert_eq!(back, cluster);
}

#[test]
fn unset_fields_are_omitted_and_null_is_explicit() {
    let reg = registry();
    let m = reg.marshaller();

    let vol = Resource::new("Volume").with("name", "v1").with("size", 10);
    assert_eq!(m.encode(&vol).unwrap(), json!({"name": "v1", "size": 10}));

    let vol = vol.with("mount_path", Value::Null);
    assert_eq!(
        m.encode(&vol).unwrap(),
        json!({"name": "v1", "size": 10, "mountPath": null})
    );

    let decoded = m
        .decode("Volume", &json!({"name": "v1", "size": 10, "mountPath": null}))
        .unwrap();
    assert_eq!(decoded.get("mount_path"), Some(&Value::Null));
}

#[test]
fn unknown_wire_fields_are_ignored() {
    let reg = registry();
    let decoded = reg
        .marshaller()
        .decode("Volume", &json!({"name": "v1", "size": 1, "colour": "blue"}))
        .unwrap();
    assert_eq!(decoded.len(), 2);
    assert!(!decoded.is_set("colour"));
}

#[test]
fn first_missing_field_in_schema_order_is_reported() {
    let reg = registry();
    let err = reg.marshaller().decode("Volume", &json!({})).unwrap_err();
    assert_eq!(err.kind, FailureKind::MissingField);
    assert_eq!(err.target.as_deref(), Some("name"));
}

#[test]
fn nested_failures_carry_the_full_path() {
    let reg = registry();
    let m = reg.marshaller();

    let err = m
        .decode(
            "Cluster",
            &json!({"name": "c", "masters": [{"name": "a"}, {"name": "b"}, {"cores": 2}]}),
        )
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::MissingField);
    assert_eq!(err.target.as_deref(), Some("masters[2].name"));

    let err = m
        .decode("Cluster", &json!({"name": "c", "identity": {"user": "u"}}))
        .unwrap_err();
    assert_eq!(err.target.as_deref(), Some("identity.appKey"));
}

#[test]
fn wrong_json_kinds_are_type_mismatches() {
    let reg = registry();
    let m = reg.marshaller();

    let err = m
        .decode("Volume", &json!({"name": "v", "size": "ten"}))
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::TypeMismatch);
    assert_eq!(err.target.as_deref(), Some("size"));

    let err = m
        .decode("Volume", &json!({"name": "v", "size": 1.5}))
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::TypeMismatch);

    let err = m.decode("Volume", &json!({"name": null, "size": 1})).unwrap_err();
    assert_eq!(err.kind, FailureKind::TypeMismatch);
    assert_eq!(err.target.as_deref(), Some("name"));

    let err = m.decode("Volume", &json!([1, 2])).unwrap_err();
    assert_eq!(err.kind, FailureKind::TypeMismatch);
    assert_eq!(err.target.as_deref(), Some("body"));

    let err = m
        .decode("Host", &json!({"name": "h", "tags": {"env": 3}}))
        .unwrap_err();
    assert_eq!(err.target.as_deref(), Some("tags[env]"));
}

#[test]
fn enum_values_outside_the_domain_are_rejected() {
    let reg = registry();
    let err = reg
        .marshaller()
        .decode("Volume", &json!({"name": "v", "size": 1, "speed": "FAST"}))
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidEnumValue);
    assert_eq!(err.target.as_deref(), Some("speed"));
    assert!(err.message.contains("COLD, HDD, SSD"));
}

#[test]
fn encoding_a_non_conforming_resource_is_internal() {
    let reg = registry();
    let m = reg.marshaller();

    let missing_required = Resource::new("Volume").with("name", "v");
    assert_eq!(m.encode(&missing_required).unwrap_err().kind, FailureKind::Internal);

    let wrong_type = Resource::new("Volume").with("name", "v").with("size", "big");
    assert_eq!(m.encode(&wrong_type).unwrap_err().kind, FailureKind::Internal);

    let bad_enum = Resource::new("Volume")
        .with("name", "v")
        .with("size", 1)
        .with("speed", Value::enumeration("FAST"));
    assert_eq!(m.encode(&bad_enum).unwrap_err().kind, FailureKind::Internal);

    let undeclared = Resource::new("Volume")
        .with("name", "v")
        .with("size", 1)
        .with("colour", "blue");
    assert_eq!(m.encode(&undeclared).unwrap_err().kind, FailureKind::Internal);

    let null_required = Resource::new("Volume").with("name", Value::Null).with("size", 1);
    assert_eq!(m.encode(&null_required).unwrap_err().kind, FailureKind::Internal);

    let unknown = Resource::new("Spaceship");
    assert_eq!(m.encode(&unknown).unwrap_err().kind, FailureKind::Internal);

    let vol = Resource::new("Volume").with("name", "v").with("size", 1);
    assert_eq!(m.encode_as("Host", &vol).unwrap_err().kind, FailureKind::Internal);
}
