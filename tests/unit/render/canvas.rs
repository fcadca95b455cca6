use super::*;
use crate::foundation::core::IntSize;
use crate::foundation::error::SurfaceError;

#[derive(Default)]
struct RecordingTarget {
    batches: Vec<Vec<DrawOp>>,
    fail: bool,
}

impl RenderTarget for RecordingTarget {
    fn size(&self) -> IntSize {
        IntSize::new(4, 4)
    }

    fn draw(&mut self, ops: &[DrawOp]) -> SurfaceResult<()> {
        if self.fail {
            return Err(SurfaceError::backend("draw rejected"));
        }
        self.batches.push(ops.to_vec());
        Ok(())
    }

    fn read_rgba8_premul(&self) -> SurfaceResult<Vec<u8>> {
        Ok(vec![0; 64])
    }

    fn write_rgba8_premul(&mut self, _rgba: &[u8]) -> SurfaceResult<()> {
        Ok(())
    }

    fn notify_content_will_change(&mut self, _mode: crate::render::target::ContentChangeMode) {}
}

fn red() -> Rgba8Premul {
    Rgba8Premul::from_straight_rgba(255, 0, 0, 255)
}

#[test]
fn finish_commits_once_in_recording_order() {
    let mut target = RecordingTarget::default();
    {
        let mut canvas = Canvas::new(&mut target);
        canvas
            .clear(Rgba8Premul::transparent())
            .fill_rect(Rect::new(0.0, 0.0, 2.0, 2.0), red());
        assert_eq!(canvas.pending_ops().len(), 2);
        canvas.finish().unwrap();
    }
    assert_eq!(target.batches.len(), 1);
    assert!(matches!(target.batches[0][0], DrawOp::Clear { .. }));
    assert!(matches!(target.batches[0][1], DrawOp::FillRect { .. }));
}

#[test]
fn drop_commits_pending_ops() {
    let mut target = RecordingTarget::default();
    {
        let mut canvas = Canvas::new(&mut target);
        canvas.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), red());
    }
    assert_eq!(target.batches.len(), 1);
}

#[test]
fn empty_canvas_does_not_touch_target() {
    let mut target = RecordingTarget::default();
    Canvas::new(&mut target).finish().unwrap();
    assert!(target.batches.is_empty());
}

#[test]
fn save_restore_scopes_transforms() {
    let mut target = RecordingTarget::default();
    let mut canvas = Canvas::new(&mut target);
    canvas.save().translate(Vec2::new(2.0, 3.0));
    canvas.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), red());
    canvas.restore();
    canvas.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), red());
    canvas.restore();
    assert_eq!(canvas.transform(), Affine::IDENTITY);

    let transforms: Vec<Affine> = canvas
        .pending_ops()
        .iter()
        .filter_map(|op| match op {
            DrawOp::FillRect { transform, .. } => Some(*transform),
            _ => None,
        })
        .collect();
    assert_eq!(
        transforms,
        vec![Affine::translate(Vec2::new(2.0, 3.0)), Affine::IDENTITY]
    );
}

#[test]
fn stroke_records_filled_outline() {
    let mut target = RecordingTarget::default();
    let mut canvas = Canvas::new(&mut target);
    let mut line = BezPath::new();
    line.move_to((0.0, 1.0));
    line.line_to((4.0, 1.0));
    canvas.stroke_path(&line, 2.0, red());
    match &canvas.pending_ops()[0] {
        DrawOp::FillPath { path, .. } => {
            let bbox = kurbo::Shape::bounding_box(path);
            assert!(bbox.height() >= 1.9, "{bbox:?}");
        }
        other => panic!("unexpected op {other:?}"),
    }
}

#[test]
fn commit_errors_surface_through_finish() {
    let mut target = RecordingTarget {
        fail: true,
        ..RecordingTarget::default()
    };
    let mut canvas = Canvas::new(&mut target);
    canvas.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), red());
    assert!(canvas.finish().is_err());
}

#[test]
fn chained_commit_on_a_temporary_canvas() {
    let mut target = RecordingTarget::default();
    Canvas::new(&mut target)
        .clear(Rgba8Premul::transparent())
        .fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), red())
        .commit()
        .unwrap();
    assert_eq!(target.batches.len(), 1);
    assert_eq!(target.batches[0].len(), 2);
}
