use super::*;

#[test]
fn known_raw_origins_decode() {
    assert_eq!(Origin::from_raw(0).unwrap(), Origin::TopLeft);
    assert_eq!(Origin::from_raw(1).unwrap(), Origin::BottomLeft);
    assert_eq!(Origin::try_from(1u32).unwrap().to_raw(), 1);
}

#[test]
fn unknown_raw_origin_is_rejected_not_defaulted() {
    for raw in [2u32, 3, 255, u32::MAX] {
        match Origin::from_raw(raw) {
            Err(SurfaceError::InvalidOrigin(v)) => assert_eq!(v, raw),
            other => panic!("raw origin {raw} produced {other:?}"),
        }
    }
}

#[test]
fn handles_are_unique() {
    let a = PlatformSurfaceHandle::next();
    let b = PlatformSurfaceHandle::next();
    assert_ne!(a, b);
    assert_eq!(PlatformSurfaceHandle::from_raw(a.raw()), a);
}

#[test]
fn backend_texture_downcast_checks_type() {
    let tex = BackendTexture::new(IntSize::new(2, 2), 42u32);
    assert_eq!(tex.size(), IntSize::new(2, 2));
    assert_eq!(tex.downcast::<u32>().unwrap(), 42);

    let tex = BackendTexture::new(IntSize::new(2, 2), 42u32);
    assert!(tex.downcast::<String>().is_err());
}
