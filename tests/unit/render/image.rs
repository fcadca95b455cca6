use super::*;

#[test]
fn rejects_wrong_byte_count() {
    assert!(Image::from_rgba8_premul(IntSize::new(2, 2), vec![0; 15]).is_err());
    assert!(Image::from_rgba8_premul(IntSize::new(2, 2), vec![0; 16]).is_ok());
}

#[test]
fn pixel_reads_row_major_and_bounds_checks() {
    let mut data = vec![0u8; 3 * 2 * 4];
    data[(3 + 2) * 4..(3 + 2) * 4 + 4].copy_from_slice(&[1, 2, 3, 4]);
    let img = Image::from_rgba8_premul(IntSize::new(3, 2), data).unwrap();
    assert_eq!(img.pixel(2, 1), Some(Rgba8Premul::from_array([1, 2, 3, 4])));
    assert_eq!(img.pixel(3, 0), None);
    assert_eq!(img.pixel(0, 2), None);
}

#[test]
fn clones_share_pixels() {
    let img = Image::from_rgba8_premul(IntSize::new(1, 1), vec![9, 9, 9, 9]).unwrap();
    let copy = img.clone();
    assert!(img.shares_data_with(&copy));
    let other = Image::from_rgba8_premul(IntSize::new(1, 1), vec![9, 9, 9, 9]).unwrap();
    assert!(!img.shares_data_with(&other));
    assert_eq!(img, other);
}

#[test]
fn to_bitmap_converts_layout() {
    let img = Image::from_rgba8_premul(IntSize::new(1, 1), vec![10, 20, 30, 255]).unwrap();
    let bgra = img
        .to_bitmap(BitmapFormat::Bgra8888, AlphaType::Premultiplied)
        .unwrap();
    assert_eq!(bgra.get_pixel(0, 0), Some([30, 20, 10, 255]));
}
