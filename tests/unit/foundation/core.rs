use super::*;

#[test]
fn int_size_display_and_area() {
    let s = IntSize::new(640, 480);
    assert_eq!(s.to_string(), "640x480");
    assert_eq!(s.area(), 640 * 480);
    assert_eq!(s.rgba8_len().unwrap(), 640 * 480 * 4);
    assert!(!s.is_empty());
    assert!(IntSize::new(0, 3).is_empty());
}

#[test]
fn int_size_rejects_rasterizer_overflow() {
    assert_eq!(IntSize::new(16, 9).to_u16().unwrap(), (16, 9));
    assert!(IntSize::new(70_000, 1).to_u16().is_err());
    assert!(IntSize::new(1, 70_000).to_u16().is_err());
}

#[test]
fn int_rect_from_size_starts_at_origin() {
    let r = IntRect::from_size(IntSize::new(8, 4));
    assert_eq!((r.x, r.y, r.width(), r.height()), (0, 0, 8, 4));
    assert_eq!(r.to_rect(), Rect::new(0.0, 0.0, 8.0, 4.0));
}

#[test]
fn premul_from_straight_rounds() {
    let c = Rgba8Premul::from_straight_rgba(255, 128, 0, 128);
    assert_eq!(c.to_array(), [128, 64, 0, 128]);
    assert_eq!(Rgba8Premul::from_array(c.to_array()), c);
    assert_eq!(Rgba8Premul::transparent().to_array(), [0, 0, 0, 0]);
}
