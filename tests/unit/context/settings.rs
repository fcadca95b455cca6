use super::*;

#[test]
fn defaults_select_cpu_without_context() {
    let settings = ContextSettings::default();
    assert_eq!(settings.backend, BackendChoice::Cpu);
    assert_eq!(settings.antialiasing, Antialiasing::Area);
    assert!(create_context(&settings).unwrap().is_none());
}

#[test]
fn json_fills_missing_fields_with_defaults() {
    let s = ContextSettings::from_json(r#"{ "backend": "software" }"#).unwrap();
    assert_eq!(s.backend, BackendChoice::Software);
    assert_eq!(s.power_preference, PowerPreference::HighPerformance);

    let s = ContextSettings::from_json(
        r#"{ "backend": "gpu", "antialiasing": "msaa16", "power_preference": "low_power" }"#,
    )
    .unwrap();
    assert_eq!(s.antialiasing, Antialiasing::Msaa16);
    assert_eq!(s.power_preference, PowerPreference::LowPower);
}

#[test]
fn json_rejects_unknown_fields_and_values() {
    assert!(ContextSettings::from_json(r#"{ "backnd": "cpu" }"#).is_err());
    assert!(ContextSettings::from_json(r#"{ "backend": "metal" }"#).is_err());
}

#[test]
fn backend_override_parses_case_insensitively() {
    let s = ContextSettings::default()
        .with_backend_override(Some(" Software "))
        .unwrap();
    assert_eq!(s.backend, BackendChoice::Software);

    let unchanged = ContextSettings::default()
        .with_backend_override(Some(""))
        .unwrap();
    assert_eq!(unchanged.backend, BackendChoice::Cpu);

    let err = ContextSettings::default()
        .with_backend_override(Some("vulkan"))
        .unwrap_err();
    assert!(matches!(err, SurfaceError::Validation(_)));
}

#[test]
fn software_choice_creates_a_named_context() {
    let settings = ContextSettings {
        backend: BackendChoice::Software,
        ..ContextSettings::default()
    };
    let ctx = create_context(&settings).unwrap().unwrap();
    assert_eq!(ctx.name(), "software");
}

#[cfg(not(feature = "gpu"))]
#[test]
fn gpu_choice_without_feature_is_unsupported() {
    let settings = ContextSettings {
        backend: BackendChoice::Gpu,
        ..ContextSettings::default()
    };
    assert!(matches!(
        create_context(&settings),
        Err(SurfaceError::Unsupported(_))
    ));
}
